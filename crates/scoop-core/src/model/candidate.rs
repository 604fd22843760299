use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::article::ArticleId;

/// One entry of a single-source ranking (semantic or lexical).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub article_id: ArticleId,
    /// 1-based position in the source ranking.
    pub rank: usize,
    /// Source-specific score. Not comparable across sources.
    pub score: f64,
}

/// A candidate after Reciprocal Rank Fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedCandidate {
    pub article_id: ArticleId,
    /// Sum of `1 / (k + rank)` over the rankings containing the article.
    pub rrf_score: f64,
    /// Rank per source name (`"semantic"`, `"lexical"`), for explainability.
    pub source_ranks: BTreeMap<String, usize>,
}

impl FusedCandidate {
    /// Rank of this candidate in the named source, if it appeared there.
    #[must_use]
    pub fn rank_in(&self, source: &str) -> Option<usize> {
        self.source_ranks.get(source).copied()
    }
}

/// A fused candidate after the LLM relevance pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankedCandidate {
    pub article_id: ArticleId,
    pub rrf_score: f64,
    /// Relevance in `[0, 1]`; `0.0` when the model call failed.
    pub relevance_score: f64,
    /// `relevance_score >= threshold`; always `false` for failed calls.
    pub is_relevant: bool,
    /// Model explanation, or the failure reason for a failed call.
    pub reason: String,
}
