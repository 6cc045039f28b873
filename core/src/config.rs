//! Tuning constants shared across the workspace.

/// Dirichlet smoothing parameter μ. Matches the Lucene LMDirichletSimilarity
/// default the evaluation numbers were calibrated against.
pub const DEFAULT_MU: f64 = 2000.0;

/// Candidates fetched per question before reranking.
pub const DEFAULT_TOP_K: usize = 2;

/// Score gap (log units) under which the top two results count as a near tie
/// worth an embedding call.
pub const RERANK_GAP_THRESHOLD: f64 = 1.0;

/// Bump whenever the on-disk layout of any index file changes.
pub const INDEX_FORMAT_VERSION: u32 = 1;
