#![forbid(unsafe_code)]
//! scoop-search library.
//!
//! Retrieval half of the novelty pipeline: the embedding gateway, semantic
//! and lexical searchers over an [`ArticleStore`], and Reciprocal Rank Fusion.
//!
//! # Conventions
//!
//! - **Errors**: `anyhow::Result` inside the store; typed [`EmbedError`] and
//!   [`scoop_core::PipelineError`] at the component boundaries.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod fusion;
pub mod ingest;
pub mod lexical;
pub mod semantic;
pub mod store;

pub use fusion::{HybridRetriever, RetrievalOutcome, rrf_fuse};
pub use ingest::{
    IngestOutcome, IngestRecord, IngestReport, Ingestor, parse_csv_records, parse_records,
};
pub use semantic::{
    EmbedError, Embedder, EmbeddingGateway, HashedEmbedder, RetryPolicy, configured_model_id,
};
pub use store::{ArticleStore, SqliteStore};
