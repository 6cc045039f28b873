use crate::normalize::{NormalizationMode, Normalizer};
use crate::DocId;
use anyhow::{ensure, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Input shape produced by the corpus parser. Missing fields arrive as empty
/// strings and are indexed as such, never rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocument {
    pub title: String,
    pub categories: String,
    pub body: String,
}

/// Stored document attributes, immutable after ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub title: String,
    pub categories: String,
    /// Body text kept verbatim for reranking and answer display.
    pub content: String,
    /// Count of index terms the document produced under the index's mode.
    pub length: u32,
}

/// One entry in a term's postings list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_frequency: u32,
}

/// Postings for a single term, ordered by `doc_id`, plus the term's total
/// occurrence count across the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingList {
    pub postings: Vec<Posting>,
    pub collection_frequency: u64,
}

/// Term → postings mapping with frozen collection statistics. Append-only
/// during build, read-only afterwards; no deletes.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    mode: NormalizationMode,
    terms: HashMap<String, PostingList>,
    docs: Vec<DocMeta>,
    total_terms: u64,
}

impl InvertedIndex {
    fn empty(mode: NormalizationMode) -> Self {
        Self {
            mode,
            terms: HashMap::new(),
            docs: Vec::new(),
            total_terms: 0,
        }
    }

    pub(crate) fn from_parts(
        mode: NormalizationMode,
        terms: HashMap<String, PostingList>,
        docs: Vec<DocMeta>,
        total_terms: u64,
    ) -> Self {
        Self { mode, terms, docs, total_terms }
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    pub fn num_docs(&self) -> u32 {
        self.docs.len() as u32
    }

    /// Total count of index terms across the collection.
    pub fn total_terms(&self) -> u64 {
        self.total_terms
    }

    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    pub fn avg_doc_length(&self) -> f64 {
        if self.docs.is_empty() {
            return 0.0;
        }
        self.total_terms as f64 / self.docs.len() as f64
    }

    pub fn document(&self, doc_id: DocId) -> Option<&DocMeta> {
        self.docs.get(doc_id as usize)
    }

    pub fn posting_list(&self, term: &str) -> Option<&PostingList> {
        self.terms.get(term)
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &PostingList)> {
        self.terms.iter().map(|(t, l)| (t.as_str(), l))
    }

    pub fn documents(&self) -> impl Iterator<Item = (DocId, &DocMeta)> {
        self.docs.iter().enumerate().map(|(id, d)| (id as DocId, d))
    }

    /// Combine partial indexes built over disjoint document shards. Part
    /// order determines final document ids: part `i`'s local ids are offset
    /// by the document counts of the parts before it. Frequencies are
    /// summed, never overwritten.
    pub fn merge(parts: Vec<InvertedIndex>) -> Result<InvertedIndex> {
        ensure!(!parts.is_empty(), "cannot merge zero partial indexes");
        let mode = parts[0].mode;
        let mut merged = InvertedIndex::empty(mode);
        for part in parts {
            ensure!(
                part.mode == mode,
                "cannot merge indexes built under different modes: {} vs {}",
                part.mode,
                mode
            );
            let offset = merged.docs.len() as DocId;
            for (term, list) in part.terms {
                let target = merged.terms.entry(term).or_default();
                target.collection_frequency += list.collection_frequency;
                target.postings.extend(list.postings.into_iter().map(|p| Posting {
                    doc_id: p.doc_id + offset,
                    term_frequency: p.term_frequency,
                }));
            }
            merged.total_terms += part.total_terms;
            merged.docs.extend(part.docs);
        }
        for list in merged.terms.values_mut() {
            list.postings.sort_by_key(|p| p.doc_id);
        }
        Ok(merged)
    }

    /// Check the collection statistics against the postings they summarize.
    /// A failure here means the index is corrupt and must not serve queries.
    pub fn verify(&self) -> Result<()> {
        let mut doc_term_sums = vec![0u64; self.docs.len()];
        let mut term_total = 0u64;
        for (term, list) in &self.terms {
            let mut sum = 0u64;
            let mut prev: Option<DocId> = None;
            for posting in &list.postings {
                ensure!(
                    (posting.doc_id as usize) < self.docs.len(),
                    "term {term:?} references unknown document {}",
                    posting.doc_id
                );
                if let Some(prev) = prev {
                    ensure!(
                        posting.doc_id > prev,
                        "postings for term {term:?} are not strictly ordered by doc id"
                    );
                }
                prev = Some(posting.doc_id);
                sum += posting.term_frequency as u64;
                doc_term_sums[posting.doc_id as usize] += posting.term_frequency as u64;
            }
            ensure!(
                sum == list.collection_frequency,
                "term {term:?} collection frequency {} does not match postings sum {sum}",
                list.collection_frequency
            );
            term_total += sum;
        }
        ensure!(
            term_total == self.total_terms,
            "collection term count {} does not match postings total {term_total}",
            self.total_terms
        );
        for (doc_id, sum) in doc_term_sums.iter().enumerate() {
            let recorded = self.docs[doc_id].length as u64;
            ensure!(
                *sum == recorded,
                "document {doc_id} length {recorded} does not match postings sum {sum}"
            );
        }
        Ok(())
    }
}

/// Streams documents through the normalizer and populates the index in a
/// single pass. Document ids are dense and assigned in first-seen order.
pub struct IndexBuilder {
    normalizer: Normalizer,
    index: InvertedIndex,
}

impl IndexBuilder {
    pub fn new(normalizer: Normalizer) -> Self {
        let mode = normalizer.mode();
        Self {
            normalizer,
            index: InvertedIndex::empty(mode),
        }
    }

    /// Index one document and return its assigned id. A document yielding
    /// zero terms is still indexed; title-only retrieval is valid.
    pub fn add_document(&mut self, raw: RawDocument) -> DocId {
        let doc_id = self.index.docs.len() as DocId;
        let blob = format!("{} {} {}", raw.title, raw.categories, raw.body);
        let terms = self.normalizer.normalize(&blob);
        let length = terms.len() as u32;

        let mut tf: HashMap<String, u32> = HashMap::new();
        for term in terms {
            *tf.entry(term).or_insert(0) += 1;
        }
        for (term, freq) in tf {
            let list = self.index.terms.entry(term).or_default();
            // doc ids only grow, so appending keeps postings ordered
            list.postings.push(Posting { doc_id, term_frequency: freq });
            list.collection_frequency += freq as u64;
        }

        self.index.total_terms += length as u64;
        self.index.docs.push(DocMeta {
            title: raw.title,
            categories: raw.categories,
            content: raw.body,
            length,
        });
        doc_id
    }

    /// Freeze the collection statistics and hand over the finished index.
    pub fn finish(self) -> InvertedIndex {
        tracing::info!(
            num_docs = self.index.docs.len(),
            num_terms = self.index.terms.len(),
            total_terms = self.index.total_terms,
            "index build complete"
        );
        self.index
    }

    pub fn build_from<I>(normalizer: Normalizer, documents: I) -> InvertedIndex
    where
        I: IntoIterator<Item = RawDocument>,
    {
        let mut builder = IndexBuilder::new(normalizer);
        for doc in documents {
            builder.add_document(doc);
        }
        builder.finish()
    }
}

/// Shares one frozen index across concurrent queries. A rebuild swaps the
/// `Arc` atomically; in-flight readers keep the snapshot they started with.
pub struct IndexHandle {
    current: RwLock<Arc<InvertedIndex>>,
}

impl IndexHandle {
    pub fn new(index: InvertedIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    pub fn load(&self) -> Arc<InvertedIndex> {
        Arc::clone(&self.current.read())
    }

    pub fn swap(&self, index: InvertedIndex) {
        *self.current.write() = Arc::new(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str, body: &str) -> RawDocument {
        RawDocument {
            title: title.to_string(),
            categories: String::new(),
            body: body.to_string(),
        }
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(NormalizationMode::Raw).unwrap()
    }

    #[test]
    fn statistics_match_postings() {
        let index = IndexBuilder::build_from(
            normalizer(),
            vec![raw("Animals", "cat dog cat"), raw("Pets", "cat bird")],
        );
        index.verify().unwrap();
        assert_eq!(index.num_docs(), 2);
        // 4 terms in doc 0 (title included), 3 in doc 1
        assert_eq!(index.total_terms(), 7);
        let cat = index.posting_list("cat").unwrap();
        assert_eq!(cat.collection_frequency, 3);
        assert_eq!(cat.postings.len(), 2);
        assert_eq!(index.document(0).unwrap().length, 4);
    }

    #[test]
    fn zero_term_document_is_still_indexed() {
        let index = IndexBuilder::build_from(normalizer(), vec![RawDocument::default()]);
        index.verify().unwrap();
        assert_eq!(index.num_docs(), 1);
        assert_eq!(index.document(0).unwrap().length, 0);
    }

    #[test]
    fn merge_matches_single_pass_build() {
        let docs = vec![
            raw("A", "alpha beta"),
            raw("B", "beta gamma"),
            raw("C", "gamma delta alpha"),
            raw("D", "delta"),
        ];
        let single = IndexBuilder::build_from(normalizer(), docs.clone());
        let left = IndexBuilder::build_from(normalizer(), docs[..2].to_vec());
        let right = IndexBuilder::build_from(normalizer(), docs[2..].to_vec());
        let merged = InvertedIndex::merge(vec![left, right]).unwrap();
        merged.verify().unwrap();
        assert_eq!(merged, single);
    }

    #[test]
    fn merge_rejects_mixed_modes() {
        let a = IndexBuilder::build_from(normalizer(), vec![raw("A", "cat")]);
        let b = IndexBuilder::build_from(
            Normalizer::new(NormalizationMode::Stem).unwrap(),
            vec![raw("B", "dogs")],
        );
        assert!(InvertedIndex::merge(vec![a, b]).is_err());
    }

    #[test]
    fn handle_swaps_atomically() {
        let handle = IndexHandle::new(IndexBuilder::build_from(normalizer(), vec![raw("A", "one")]));
        let before = handle.load();
        handle.swap(IndexBuilder::build_from(normalizer(), vec![raw("A", "one"), raw("B", "two")]));
        assert_eq!(before.num_docs(), 1);
        assert_eq!(handle.load().num_docs(), 2);
    }
}
