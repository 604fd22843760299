//! End-to-end novelty assessment.
//!
//! retrieve → fetch candidate text → rerank → adjudicate → policy → persist.
//! Article-local failures (embedding, adjudication) are reported per entry;
//! store failures abort the batch.

use chrono::Utc;
use scoop_core::config::ScoopConfig;
use scoop_core::{ArticleId, IncomingArticle, NoveltyVerdict, PipelineError, RerankedCandidate, TopMatch};
use scoop_search::{ArticleStore, EmbeddingGateway, HybridRetriever, RetrievalOutcome};
use serde::Serialize;
use tracing::{error, info, info_span, warn};

use crate::adjudicate::{RelevantMatch, TextClassifier, verdict_without_matches};
use crate::policy::DecisionPolicy;
use crate::rerank::{CandidateArticle, Reranker};

/// A verdict plus the intermediate rankings that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub verdict: NoveltyVerdict,
    pub retrieval: RetrievalOutcome,
    pub reranked: Vec<RerankedCandidate>,
}

/// Per-article result of a batch run. Every input yields exactly one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchEntry {
    Decided(NoveltyVerdict),
    Failed {
        incoming_article_id: ArticleId,
        code: String,
        reason: String,
    },
}

impl BatchEntry {
    #[must_use]
    pub const fn verdict(&self) -> Option<&NoveltyVerdict> {
        match self {
            Self::Decided(verdict) => Some(verdict),
            Self::Failed { .. } => None,
        }
    }
}

pub struct NoveltyPipeline<'a, S: ArticleStore> {
    store: &'a S,
    retriever: HybridRetriever<'a, S>,
    reranker: Reranker<'a>,
    classifier: &'a dyn TextClassifier,
    policy: DecisionPolicy,
}

impl<S: ArticleStore> std::fmt::Debug for NoveltyPipeline<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoveltyPipeline")
            .field("reranker", &self.reranker)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<'a, S: ArticleStore> NoveltyPipeline<'a, S> {
    #[must_use]
    pub fn new(
        store: &'a S,
        gateway: &'a EmbeddingGateway,
        reranker: Reranker<'a>,
        classifier: &'a dyn TextClassifier,
        config: &ScoopConfig,
    ) -> Self {
        Self {
            store,
            retriever: HybridRetriever::new(store, gateway, &config.retrieval),
            reranker,
            classifier,
            policy: DecisionPolicy::from_config(&config.novelty),
        }
    }

    /// Assess one article without persisting the verdict.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::EmbeddingUnavailable`] or
    ///   [`PipelineError::AdjudicationFailed`] for this article only
    /// - [`PipelineError::SearchFailed`] if the store is unreachable
    pub fn assess(&self, incoming: &IncomingArticle) -> Result<Assessment, PipelineError> {
        let span = info_span!("assess", article_id = %incoming.id);
        let _guard = span.enter();

        let text = incoming.search_text();
        let retrieval = self.retriever.retrieve(&text)?;

        let ids: Vec<ArticleId> = retrieval
            .fused
            .iter()
            .map(|c| c.article_id.clone())
            .collect();
        let articles = self
            .store
            .fetch_articles(&ids)
            .map_err(PipelineError::SearchFailed)?;
        let candidates: Vec<CandidateArticle> = retrieval
            .fused
            .iter()
            .filter_map(|fused| {
                articles
                    .iter()
                    .find(|a| a.id == fused.article_id)
                    .map(|article| CandidateArticle {
                        fused: fused.clone(),
                        article: article.clone(),
                    })
            })
            .collect();

        let reranked = self.reranker.rerank(&text, &candidates).scored;
        let matches: Vec<RelevantMatch> = reranked
            .iter()
            .zip(&candidates)
            .filter(|(scored, _)| scored.is_relevant)
            .map(|(scored, candidate)| RelevantMatch {
                article_id: scored.article_id.clone(),
                text: candidate.article.search_text(),
                relevance_score: scored.relevance_score,
            })
            .collect();

        let raw = if matches.is_empty() {
            verdict_without_matches(retrieval.found_any())
        } else {
            self.classifier.classify(incoming, &matches)?
        };

        let label = self.policy.decide(raw.label, raw.confidence);
        if label != raw.label {
            info!(
                model_label = %raw.label,
                confidence = raw.confidence,
                threshold = self.policy.threshold(),
                "low confidence, routed to review"
            );
        }

        let top_match = matches
            .iter()
            .fold(None::<&RelevantMatch>, |best, m| match best {
                Some(b) if b.relevance_score >= m.relevance_score => Some(b),
                _ => Some(m),
            })
            .map(|m| TopMatch {
                article_id: m.article_id.clone(),
                relevance_score: m.relevance_score,
            });

        let verdict = NoveltyVerdict {
            verdict_id: None,
            incoming_article_id: incoming.id.clone(),
            incoming_text: text,
            label,
            model_label: raw.model_called.then_some(raw.label),
            confidence: raw.confidence,
            reasoning: raw.reasoning,
            matched_article_ids: matches.iter().map(|m| m.article_id.clone()).collect(),
            new_information: raw.new_information,
            status_change_detected: raw.status_change_detected,
            top_match,
            created_at: Utc::now(),
        };
        info!(label = %verdict.label, confidence = verdict.confidence, matches = verdict.matched_article_ids.len(), "assessed");

        Ok(Assessment {
            verdict,
            retrieval,
            reranked,
        })
    }

    /// Assess one article and append the verdict to the store.
    ///
    /// # Errors
    ///
    /// As [`Self::assess`]; a failed verdict write is a
    /// [`PipelineError::SearchFailed`].
    pub fn assess_and_record(&self, incoming: &IncomingArticle) -> Result<Assessment, PipelineError> {
        let mut assessment = self.assess(incoming)?;
        let id = self
            .store
            .insert_verdict(&assessment.verdict)
            .map_err(PipelineError::SearchFailed)?;
        assessment.verdict.verdict_id = Some(id);
        Ok(assessment)
    }

    /// Assess and record every article, in input order.
    ///
    /// # Errors
    ///
    /// Returns the first task-aborting error (an unreachable store). All
    /// other failures become [`BatchEntry::Failed`].
    pub fn assess_batch(&self, incoming: &[IncomingArticle]) -> Result<Vec<BatchEntry>, PipelineError> {
        let mut entries = Vec::with_capacity(incoming.len());
        for article in incoming {
            match self.assess_and_record(article) {
                Ok(assessment) => entries.push(BatchEntry::Decided(assessment.verdict)),
                Err(err) if err.aborts_task() => {
                    error!(article_id = %article.id, error = %err, "aborting batch");
                    return Err(err);
                }
                Err(err) => {
                    warn!(article_id = %article.id, code = %err.code(), error = %err, "article failed");
                    entries.push(BatchEntry::Failed {
                        incoming_article_id: article.id.clone(),
                        code: err.code().code().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let decided = entries.iter().filter(|e| e.verdict().is_some()).count();
        info!(total = entries.len(), decided, failed = entries.len() - decided, "batch finished");
        Ok(entries)
    }
}
