//! Hybrid retrieval: semantic and lexical rankings fused with RRF.
//!
//! Unlike a best-effort search box, a novelty check must not silently lose a
//! signal: an embedding failure is reported to the caller, and a store
//! failure aborts the task.

use scoop_core::config::RetrievalConfig;
use scoop_core::{FusedCandidate, PipelineError, RankedCandidate};
use serde::Serialize;
use tracing::{debug, info};

use super::rrf::{LEXICAL_SOURCE, SEMANTIC_SOURCE, rrf_fuse};
use crate::semantic::EmbeddingGateway;
use crate::store::ArticleStore;

/// Both source rankings and their fusion, kept together for explainability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalOutcome {
    pub semantic: Vec<RankedCandidate>,
    pub lexical: Vec<RankedCandidate>,
    /// Fused candidates truncated to `top_k`.
    pub fused: Vec<FusedCandidate>,
}

impl RetrievalOutcome {
    /// Whether either source produced any candidate.
    #[must_use]
    pub fn found_any(&self) -> bool {
        !self.fused.is_empty()
    }
}

/// Runs both searchers for one text and fuses the results.
#[derive(Debug)]
pub struct HybridRetriever<'a, S: ArticleStore> {
    store: &'a S,
    gateway: &'a EmbeddingGateway,
    top_k: usize,
    rrf_k: usize,
}

impl<'a, S: ArticleStore> HybridRetriever<'a, S> {
    #[must_use]
    pub const fn new(
        store: &'a S,
        gateway: &'a EmbeddingGateway,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            top_k: config.top_k,
            rrf_k: config.rrf_k,
        }
    }

    /// Override `top_k` for one call site (e.g. a CLI flag).
    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Retrieve and fuse candidates for `text`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::EmbeddingUnavailable`] if the text cannot be embedded
    /// - [`PipelineError::SearchFailed`] if either search fails
    pub fn retrieve(&self, text: &str) -> Result<RetrievalOutcome, PipelineError> {
        let embedding = self.gateway.embed(text)?;

        let semantic = self
            .store
            .search_semantic(&embedding, self.top_k)
            .map_err(PipelineError::SearchFailed)?;
        let lexical = self
            .store
            .search_lexical(text, self.top_k)
            .map_err(PipelineError::SearchFailed)?;

        let mut fused = rrf_fuse(
            &[(SEMANTIC_SOURCE, semantic.as_slice()), (LEXICAL_SOURCE, lexical.as_slice())],
            self.rrf_k,
        );
        let before_truncation = fused.len();
        fused.truncate(self.top_k);

        debug!(
            semantic_ids = ?semantic.iter().map(|c| c.article_id.as_str()).collect::<Vec<_>>(),
            lexical_ids = ?lexical.iter().map(|c| c.article_id.as_str()).collect::<Vec<_>>(),
            "source rankings"
        );
        info!(
            semantic_hits = semantic.len(),
            lexical_hits = lexical.len(),
            fused_unique = before_truncation,
            returned = fused.len(),
            "hybrid retrieval complete"
        );

        Ok(RetrievalOutcome {
            semantic,
            lexical,
            fused,
        })
    }
}
