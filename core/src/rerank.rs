use crate::index::InvertedIndex;
use crate::search::ScoredResult;
use anyhow::{bail, ensure, Context, Result};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Externally supplied text-embedding capability. The core never depends on
/// a concrete embedding runtime; tests substitute deterministic stubs.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Cosine similarity of two equal-length vectors. A zero-magnitude input
/// yields 0 rather than a division failure; a dimension mismatch is an
/// error the caller recovers from per query.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    ensure!(
        a.len() == b.len(),
        "embedding dimensions differ: {} vs {}",
        a.len(),
        b.len()
    );
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += *x as f64 * *y as f64;
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Resolve near-ties among the top candidates by semantic similarity.
///
/// Returns `None` only for an empty result list. Without an embedder, with
/// a single candidate, or when the top-two score gap reaches the threshold,
/// the lexical top result is returned and the embedder is never invoked.
/// Otherwise the query and both candidates' stored content are embedded and
/// the higher cosine similarity wins; ties keep the lexical top. Any
/// embedding failure falls back to the lexical top for this query only.
pub fn rerank(
    index: &InvertedIndex,
    results: &[ScoredResult],
    query: &str,
    embedder: Option<&dyn Embedder>,
    gap_threshold: f64,
) -> Option<ScoredResult> {
    let first = *results.first()?;
    let Some(embedder) = embedder else { return Some(first) };
    let Some(second) = results.get(1).copied() else { return Some(first) };
    if first.score - second.score >= gap_threshold {
        return Some(first);
    }
    match semantic_pick(index, query, first, second, embedder) {
        Ok(winner) => Some(winner),
        Err(err) => {
            tracing::warn!(error = %err, "rerank fell back to lexical top result");
            Some(first)
        }
    }
}

fn semantic_pick(
    index: &InvertedIndex,
    query: &str,
    first: ScoredResult,
    second: ScoredResult,
    embedder: &dyn Embedder,
) -> Result<ScoredResult> {
    let first_doc = index
        .document(first.doc_id)
        .context("top candidate missing from index")?;
    let second_doc = index
        .document(second.doc_id)
        .context("runner-up candidate missing from index")?;
    let query_vec = embedder.embed(query)?;
    let first_sim = cosine_similarity(&query_vec, &embedder.embed(&first_doc.content)?)?;
    let second_sim = cosine_similarity(&query_vec, &embedder.embed(&second_doc.content)?)?;
    if second_sim > first_sim {
        Ok(second)
    } else {
        Ok(first)
    }
}

/// Bounds a blocking embedding provider with a deadline. A call that misses
/// the deadline returns an error; the inner call keeps running on its worker
/// thread and only its result is abandoned.
pub struct TimeoutEmbedder {
    inner: Arc<dyn Embedder>,
    timeout: Duration,
}

impl TimeoutEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl Embedder for TimeoutEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let text = text.to_owned();
        thread::spawn(move || {
            let _ = tx.send(inner.embed(&text));
        });
        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(_) => bail!("embedding call timed out after {:?}", self.timeout),
        }
    }
}
