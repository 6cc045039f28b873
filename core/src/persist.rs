use crate::config::INDEX_FORMAT_VERSION;
use crate::index::{DocMeta, InvertedIndex, PostingList};
use crate::normalize::NormalizationMode;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Human-readable index header. The mode recorded here is what makes an
/// index valid only for queries normalized the same way.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub mode: NormalizationMode,
    pub created_at: String,
    pub num_docs: u32,
    pub total_terms: u64,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    /// Index directory for one mode under a shared root.
    pub fn for_mode<P: AsRef<Path>>(root: P, mode: NormalizationMode) -> Self {
        Self { root: root.as_ref().join(mode.dir_name()) }
    }

    fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }
    fn docs(&self) -> PathBuf {
        self.root.join("docs.bin")
    }
    fn postings(&self) -> PathBuf {
        self.root.join("postings.bin")
    }
}

pub fn save_index(paths: &IndexPaths, index: &InvertedIndex, created_at: &str) -> Result<()> {
    create_dir_all(&paths.root)?;

    let meta = MetaFile {
        version: INDEX_FORMAT_VERSION,
        mode: index.mode(),
        created_at: created_at.to_string(),
        num_docs: index.num_docs(),
        total_terms: index.total_terms(),
    };
    let mut f = File::create(paths.meta())?;
    f.write_all(serde_json::to_string_pretty(&meta)?.as_bytes())?;

    let docs: Vec<&DocMeta> = index.documents().map(|(_, d)| d).collect();
    let mut f = File::create(paths.docs())?;
    f.write_all(&bincode::serialize(&docs)?)?;

    let postings: HashMap<&str, &PostingList> = index.terms().collect();
    let mut f = File::create(paths.postings())?;
    f.write_all(&bincode::serialize(&postings)?)?;

    tracing::info!(root = %paths.root.display(), mode = %index.mode(), "index persisted");
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())
        .with_context(|| format!("no index meta at {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf).context("unreadable index meta")?;
    Ok(meta)
}

/// Load a persisted index and refuse to serve anything questionable: wrong
/// format version, a mode other than the one the caller will normalize
/// queries with, or statistics that disagree with the loaded postings.
pub fn load_index(paths: &IndexPaths, expected_mode: NormalizationMode) -> Result<InvertedIndex> {
    let meta = load_meta(paths)?;
    ensure!(
        meta.version == INDEX_FORMAT_VERSION,
        "index format version {} is not supported (expected {})",
        meta.version,
        INDEX_FORMAT_VERSION
    );
    ensure!(
        meta.mode == expected_mode,
        "index at {} was built under mode {}, queries use mode {expected_mode}",
        paths.root.display(),
        meta.mode
    );

    let mut buf = Vec::new();
    File::open(paths.docs())?.read_to_end(&mut buf)?;
    let docs: Vec<DocMeta> = bincode::deserialize(&buf).context("corrupt document table")?;

    let mut buf = Vec::new();
    File::open(paths.postings())?.read_to_end(&mut buf)?;
    let postings: HashMap<String, PostingList> =
        bincode::deserialize(&buf).context("corrupt postings")?;

    ensure!(
        docs.len() as u32 == meta.num_docs,
        "document table holds {} entries, meta records {}",
        docs.len(),
        meta.num_docs
    );
    let index = InvertedIndex::from_parts(meta.mode, postings, docs, meta.total_terms);
    index
        .verify()
        .with_context(|| format!("corrupt index at {}", paths.root.display()))?;
    tracing::info!(
        root = %paths.root.display(),
        num_docs = index.num_docs(),
        vocabulary = index.vocabulary_size(),
        "index loaded"
    );
    Ok(index)
}
