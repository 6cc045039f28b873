pub mod config;
pub mod index;
pub mod normalize;
pub mod persist;
pub mod rerank;
pub mod search;

/// Dense document identifier, assigned in first-seen order at build time.
pub type DocId = u32;

pub use index::{DocMeta, IndexBuilder, IndexHandle, InvertedIndex, Posting, PostingList, RawDocument};
pub use normalize::{Lemmatizer, NormalizationMode, Normalizer};
pub use rerank::{Embedder, TimeoutEmbedder};
pub use search::ScoredResult;
