#![forbid(unsafe_code)]
//! scoop-core library.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for orchestration code and the typed
//!   errors in [`error`] at component boundaries.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod text;

pub use config::ScoopConfig;
pub use error::{ErrorCode, PipelineError};
pub use model::{
    Article, ArticleId, FusedCandidate, IncomingArticle, Label, NoveltyVerdict, RankedCandidate,
    RerankedCandidate, TopMatch,
};
