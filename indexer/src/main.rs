use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};
use trivia_core::persist::{save_index, IndexPaths};
use trivia_core::{IndexBuilder, NormalizationMode, Normalizer, RawDocument};
use walkdir::WalkDir;

const CATEGORIES_PREFIX: &str = "CATEGORIES:";

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build per-mode inverted indexes from an encyclopedia dump", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from a directory of dump files
    Build {
        /// Directory of dump files
        #[arg(long)]
        input: String,
        /// Root directory the per-mode index directories go under
        #[arg(long)]
        output: String,
        /// Normalization mode: raw|stopwords|stem|stopwords-stem
        #[arg(long, default_value = "raw")]
        mode: String,
        /// Build every mode that needs no external provider
        #[arg(long, default_value_t = false)]
        all_modes: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, mode, all_modes } => {
            let modes: Vec<NormalizationMode> = if all_modes {
                vec![
                    NormalizationMode::Raw,
                    NormalizationMode::Stopwords,
                    NormalizationMode::Stem,
                    NormalizationMode::StopwordsStem,
                ]
            } else {
                vec![NormalizationMode::from_str(&mode)?]
            };
            for mode in modes {
                build_index(&input, &output, mode)?;
            }
            Ok(())
        }
    }
}

fn build_index(input: &str, output: &str, mode: NormalizationMode) -> Result<()> {
    let paths = IndexPaths::for_mode(output, mode);
    if index_already_built(&paths.root) {
        tracing::info!(root = %paths.root.display(), "index already built, skipping");
        return Ok(());
    }

    let normalizer = Normalizer::new(mode)
        .with_context(|| format!("mode {mode} cannot be built by this tool"))?;
    let mut builder = IndexBuilder::new(normalizer);

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
        if entry.path().is_file() {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    for file in &files {
        tracing::info!(file = %file.display(), "indexing dump file");
        let reader = BufReader::new(
            File::open(file).with_context(|| format!("cannot open {}", file.display()))?,
        );
        for article in parse_dump(reader)? {
            builder.add_document(article);
        }
    }

    let index = builder.finish();
    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    save_index(&paths, &index, &created_at)?;
    Ok(())
}

fn index_already_built(root: &Path) -> bool {
    root.join("meta.json").is_file()
}

/// Parse the dump's line format: `[[Title]]` starts an article,
/// `CATEGORIES: ...` sets its categories, `==Header==` lines join the body
/// with the `=` markers removed, anything else is body text. Articles
/// missing categories or body still index.
fn parse_dump<R: BufRead>(reader: R) -> Result<Vec<RawDocument>> {
    let mut articles = Vec::new();
    let mut title = String::new();
    let mut categories = String::new();
    let mut body_lines: Vec<String> = Vec::new();

    let flush = |title: &mut String,
                 categories: &mut String,
                 body_lines: &mut Vec<String>,
                 articles: &mut Vec<RawDocument>| {
        if title.is_empty() && categories.is_empty() && body_lines.is_empty() {
            return;
        }
        articles.push(RawDocument {
            title: std::mem::take(title),
            categories: std::mem::take(categories),
            body: std::mem::take(body_lines).join(" "),
        });
    };

    for line in reader.lines() {
        let line = line?;
        if is_title_line(&line) {
            flush(&mut title, &mut categories, &mut body_lines, &mut articles);
            title = line[2..line.len() - 2].to_string();
        } else if let Some(rest) = line.strip_prefix(CATEGORIES_PREFIX) {
            categories = rest.trim().to_string();
        } else if is_header_line(&line) {
            body_lines.push(line.replace('=', ""));
        } else if !line.trim().is_empty() {
            body_lines.push(line);
        }
    }
    flush(&mut title, &mut categories, &mut body_lines, &mut articles);
    Ok(articles)
}

fn is_title_line(line: &str) -> bool {
    line.starts_with("[[") && line.ends_with("]]") && line.len() > 4
}

fn is_header_line(line: &str) -> bool {
    line.starts_with('=') && line.ends_with('=') && line.len() > 2
}
