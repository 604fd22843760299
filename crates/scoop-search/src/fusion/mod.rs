//! Reciprocal Rank Fusion and the hybrid retriever built on it.

pub mod hybrid;
pub mod rrf;

pub use hybrid::{HybridRetriever, RetrievalOutcome};
pub use rrf::{DEFAULT_RRF_K, LEXICAL_SOURCE, SEMANTIC_SOURCE, rrf_fuse};
