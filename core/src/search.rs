use crate::index::InvertedIndex;
use crate::normalize::Normalizer;
use crate::DocId;
use std::cmp::Ordering;
use std::collections::HashMap;

/// A candidate document and its Dirichlet log score. Scores are finite;
/// ties break by ascending doc id for a strict total order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredResult {
    pub doc_id: DocId,
    pub score: f64,
}

/// Rank documents against a free-text query with Dirichlet-smoothed
/// language-model scoring:
///
/// score(d, q) = Σ_t ln((tf(t,d) + μ·cf(t)/T) / (|d| + μ))
///
/// summed over the normalized query terms, with multiplicity. Terms absent
/// from the vocabulary contribute nothing and are skipped. Only documents
/// containing at least one query term are scored; an empty query or a full
/// vocabulary miss yields an empty result vector, not an error. μ must be
/// positive.
pub fn search(
    index: &InvertedIndex,
    normalizer: &Normalizer,
    query: &str,
    k: usize,
    mu: f64,
) -> Vec<ScoredResult> {
    let query_terms = normalizer.normalize(query);
    if query_terms.is_empty() || index.num_docs() == 0 || index.total_terms() == 0 {
        return Vec::new();
    }
    let total = index.total_terms() as f64;

    // Decompose the score as Σ_t ln(tf + μ·p_t) − m·ln(|d| + μ), where m is
    // the count of known query terms. The first sum equals a shared
    // background of Σ_t ln(μ·p_t) plus a per-document adjustment from the
    // postings the document actually matches, which keeps scoring a single
    // pass over the queried postings.
    let mut background = 0.0;
    let mut known_terms = 0usize;
    let mut adjustments: HashMap<DocId, f64> = HashMap::new();
    for term in &query_terms {
        let Some(list) = index.posting_list(term) else { continue };
        let prior = mu * list.collection_frequency as f64 / total;
        background += prior.ln();
        known_terms += 1;
        for posting in &list.postings {
            *adjustments.entry(posting.doc_id).or_insert(0.0) +=
                (posting.term_frequency as f64 + prior).ln() - prior.ln();
        }
    }
    if known_terms == 0 {
        return Vec::new();
    }

    let mut results: Vec<ScoredResult> = adjustments
        .into_iter()
        .map(|(doc_id, adjustment)| {
            let length = index.document(doc_id).map(|d| d.length).unwrap_or(0) as f64;
            let score = background + adjustment - known_terms as f64 * (length + mu).ln();
            ScoredResult { doc_id, score }
        })
        .collect();
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    results.truncate(k);
    results
}
