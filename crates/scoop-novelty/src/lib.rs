#![forbid(unsafe_code)]
//! scoop-novelty library.
//!
//! Adjudication half of the pipeline: an LLM relevance pass over fused
//! candidates, a PUBLISH/SKIP classification against the relevant ones, and a
//! deterministic confidence policy that routes uncertain calls to REVIEW.
//!
//! # Conventions
//!
//! - **Errors**: typed [`llm::LlmError`] and [`payload::PayloadError`] at the
//!   model boundary, [`scoop_core::PipelineError`] for pipeline outcomes.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod adjudicate;
pub mod evaluate;
pub mod llm;
pub mod payload;
pub mod pipeline;
pub mod policy;
pub mod prompts;
pub mod report;
pub mod rerank;

pub use adjudicate::{LlmNoveltyClassifier, RawVerdict, RelevantMatch, TextClassifier};
pub use evaluate::{EvaluationReport, EvaluationRow, evaluate};
pub use llm::{CompletionRequest, LanguageModel, LlmError, OpenAiChatClient};
pub use pipeline::{Assessment, BatchEntry, NoveltyPipeline};
pub use policy::DecisionPolicy;
pub use report::VerdictReport;
pub use rerank::{CandidateArticle, RerankOutcome, Reranker};
