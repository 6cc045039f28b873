use anyhow::{Context, Result};
use clap::Parser;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};
use trivia_core::config::{DEFAULT_MU, DEFAULT_TOP_K, RERANK_GAP_THRESHOLD};
use trivia_core::persist::{load_index, IndexPaths};
use trivia_core::rerank::rerank;
use trivia_core::search::search;
use trivia_core::{Embedder, InvertedIndex, NormalizationMode, Normalizer};

#[derive(Parser)]
#[command(name = "eval")]
#[command(about = "Run labeled trivia questions against a built index", long_about = None)]
struct Args {
    /// Question file: 4-line records (category, clue, answer, separator)
    #[arg(long)]
    questions: String,
    /// Root directory holding the per-mode index directories
    #[arg(long, default_value = "./index")]
    index: String,
    /// Normalization mode the index was built with
    #[arg(long, default_value = "raw")]
    mode: String,
    /// Dirichlet smoothing parameter
    #[arg(long, default_value_t = DEFAULT_MU)]
    mu: f64,
    /// Score gap under which near-ties go to the semantic reranker
    #[arg(long, default_value_t = RERANK_GAP_THRESHOLD)]
    gap_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Question {
    category: String,
    clue: String,
    answer: String,
}

/// Running (correct, incorrect) counts for one category. Owned by the
/// evaluation accumulator, never shared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CategoryStats {
    correct: u32,
    incorrect: u32,
}

impl CategoryStats {
    fn record(&mut self, correct: bool) {
        if correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
    }

    fn merge(&mut self, other: CategoryStats) {
        self.correct += other.correct;
        self.incorrect += other.incorrect;
    }
}

/// Precision as a percentage, computed at report time from the counts.
fn precision(stats: CategoryStats) -> f64 {
    let total = stats.correct + stats.incorrect;
    if total == 0 {
        return 0.0;
    }
    stats.correct as f64 * 100.0 / total as f64
}

/// Accumulated evaluation results, threaded through the run as a value.
#[derive(Debug, Default)]
struct Evaluation {
    per_category: HashMap<String, CategoryStats>,
    correct: u32,
    total: u32,
}

impl Evaluation {
    fn record(&mut self, category: &str, correct: bool) {
        self.per_category.entry(category.to_string()).or_default().record(correct);
        if correct {
            self.correct += 1;
        }
        self.total += 1;
    }

    fn merge(&mut self, other: Evaluation) {
        for (category, stats) in other.per_category {
            self.per_category.entry(category).or_default().merge(stats);
        }
        self.correct += other.correct;
        self.total += other.total;
    }

    fn precision_at_1(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }

    /// Categories with precision, sorted by descending precision then name.
    fn category_report(&self) -> Vec<(&str, CategoryStats, f64)> {
        let mut rows: Vec<(&str, CategoryStats, f64)> = self
            .per_category
            .iter()
            .map(|(name, stats)| (name.as_str(), *stats, precision(*stats)))
            .collect();
        rows.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        rows
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let mode = NormalizationMode::from_str(&args.mode)?;
    let normalizer = Normalizer::new(mode)?;
    let paths = IndexPaths::for_mode(&args.index, mode);
    let index = load_index(&paths, mode)?;

    let reader = BufReader::new(
        File::open(&args.questions)
            .with_context(|| format!("cannot open question file {}", args.questions))?,
    );
    let questions = parse_questions(reader)?;
    tracing::info!(count = questions.len(), %mode, "running evaluation");

    // Embedding providers plug in through trivia_core::Embedder; none ships
    // with this tool, so near-ties resolve to the lexical top result.
    let evaluation = evaluate(
        &index,
        &normalizer,
        &questions,
        None,
        args.mu,
        args.gap_threshold,
    );

    println!();
    println!("For index: {}", paths.root.display());
    println!("Correct answers: {} /{}", evaluation.correct, evaluation.total);
    println!("P@1: {}", evaluation.precision_at_1());
    println!();
    for (category, stats, precision) in evaluation.category_report() {
        println!(
            "{category}: Correct: {}, Incorrect: {}, Precision: {precision}",
            stats.correct, stats.incorrect
        );
    }
    Ok(())
}

fn evaluate(
    index: &InvertedIndex,
    normalizer: &Normalizer,
    questions: &[Question],
    embedder: Option<&dyn Embedder>,
    mu: f64,
    gap_threshold: f64,
) -> Evaluation {
    let mut evaluation = Evaluation::default();
    for question in questions {
        let query = format!("{} {}", question.category, question.clue);
        let results = search(index, normalizer, &query, DEFAULT_TOP_K, mu);
        let best = rerank(index, &results, &query, embedder, gap_threshold);
        let actual = best
            .and_then(|r| index.document(r.doc_id))
            .map(|d| d.title.as_str())
            .unwrap_or("");
        let correct = actual.to_lowercase() == question.answer.to_lowercase();
        evaluation.record(&question.category, correct);

        println!();
        println!("Category: {}", question.category);
        println!("Question: {}", question.clue);
        println!("Expected answer: {}", question.answer);
        println!("Actual answer: {actual}");
        println!("Is correct: {correct}");
    }
    evaluation
}

/// Question files hold 4-line records: category, clue, answer, separator.
/// A trailing record may omit the separator line.
fn parse_questions<R: BufRead>(reader: R) -> Result<Vec<Question>> {
    let mut questions = Vec::new();
    let mut record: Vec<String> = Vec::new();
    for line in reader.lines() {
        let line = line?;
        match record.len() {
            0 | 1 | 2 => record.push(line.trim().to_string()),
            _ => {
                questions.push(Question {
                    category: record[0].clone(),
                    clue: record[1].clone(),
                    answer: record[2].clone(),
                });
                record.clear();
            }
        }
    }
    if record.len() == 3 {
        questions.push(Question {
            category: record[0].clone(),
            clue: record[1].clone(),
            answer: record[2].clone(),
        });
    }
    Ok(questions)
}
