//! LLM relevance reranking of fused candidates.
//!
//! Fail-closed: a candidate whose call errors, times out, or returns
//! unparseable output is scored `0.0` and marked irrelevant. One bad call
//! never aborts the pass. Output always follows fused order.

use scoop_core::config::RerankerConfig;
use scoop_core::{Article, FusedCandidate, PipelineError, RerankedCandidate};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::llm::{CompletionRequest, LanguageModel};
use crate::payload::{parse_payload, unit_score};
use crate::prompts::{RERANK_SYSTEM_PROMPT, rerank_prompt};

/// A fused candidate together with the stored article it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateArticle {
    pub fused: FusedCandidate,
    pub article: Article,
}

#[derive(Debug, Deserialize)]
struct RelevancePayload {
    relevance: f64,
    #[serde(default)]
    reason: String,
}

/// Every scored candidate, in fused order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RerankOutcome {
    pub scored: Vec<RerankedCandidate>,
    /// Number of candidates excluded because their call failed.
    pub failures: usize,
}

impl RerankOutcome {
    /// Relevant candidates, still in fused order.
    pub fn relevant(&self) -> impl Iterator<Item = &RerankedCandidate> {
        self.scored.iter().filter(|c| c.is_relevant)
    }
}

pub struct Reranker<'a> {
    model: &'a dyn LanguageModel,
    threshold: f64,
    budget: usize,
    workers: usize,
}

impl std::fmt::Debug for Reranker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reranker")
            .field("threshold", &self.threshold)
            .field("budget", &self.budget)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl<'a> Reranker<'a> {
    /// `budget` caps how many fused candidates are sent to the model.
    #[must_use]
    pub fn new(model: &'a dyn LanguageModel, config: &RerankerConfig, budget: usize) -> Self {
        Self {
            model,
            threshold: config.relevance_threshold,
            budget,
            workers: config.workers.max(1),
        }
    }

    /// Score up to `budget` candidates against the incoming text.
    #[must_use]
    pub fn rerank(&self, incoming: &str, candidates: &[CandidateArticle]) -> RerankOutcome {
        let selected = &candidates[..candidates.len().min(self.budget)];
        if selected.is_empty() {
            return RerankOutcome::default();
        }

        let results: Vec<(RerankedCandidate, bool)> = if self.workers == 1 || selected.len() == 1 {
            selected
                .iter()
                .map(|candidate| self.score_one(incoming, candidate))
                .collect()
        } else {
            self.score_parallel(incoming, selected)
        };

        let failures = results.iter().filter(|(_, failed)| *failed).count();
        let outcome = RerankOutcome {
            scored: results.into_iter().map(|(candidate, _)| candidate).collect(),
            failures,
        };
        info!(
            input = selected.len(),
            relevant = outcome.relevant().count(),
            failures = outcome.failures,
            "reranking done"
        );
        outcome
    }

    fn score_parallel(
        &self,
        incoming: &str,
        selected: &[CandidateArticle],
    ) -> Vec<(RerankedCandidate, bool)> {
        let chunk_size = selected.len().div_ceil(self.workers);
        std::thread::scope(|scope| {
            let handles: Vec<_> = selected
                .chunks(chunk_size)
                .map(|chunk| {
                    let handle = scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|candidate| self.score_one(incoming, candidate))
                            .collect::<Vec<_>>()
                    });
                    (chunk, handle)
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|(chunk, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        chunk
                            .iter()
                            .map(|candidate| failed(candidate, "rerank worker panicked".into()))
                            .collect()
                    })
                })
                .collect()
        })
    }

    /// Score one candidate; the flag is `true` when the call failed.
    fn score_one(&self, incoming: &str, candidate: &CandidateArticle) -> (RerankedCandidate, bool) {
        let prompt = rerank_prompt(incoming, &candidate.article.search_text());
        let request = CompletionRequest::json(Some(RERANK_SYSTEM_PROMPT), &prompt);

        let parsed = self
            .model
            .complete(&request)
            .map_err(|err| err.to_string())
            .and_then(|text| parse_payload::<RelevancePayload>(&text).map_err(|err| err.to_string()))
            .and_then(|payload| {
                unit_score("relevance", payload.relevance)
                    .map(|score| (score, payload.reason))
                    .map_err(|err| err.to_string())
            });

        match parsed {
            Ok((score, reason)) => {
                debug!(
                    article_id = %candidate.fused.article_id,
                    relevance = score,
                    "rerank result"
                );
                let scored = RerankedCandidate {
                    article_id: candidate.fused.article_id.clone(),
                    rrf_score: candidate.fused.rrf_score,
                    relevance_score: score,
                    is_relevant: score >= self.threshold,
                    reason,
                };
                (scored, false)
            }
            Err(reason) => failed(candidate, reason),
        }
    }
}

fn failed(candidate: &CandidateArticle, reason: String) -> (RerankedCandidate, bool) {
    let error = PipelineError::RerankCallFailed {
        article_id: candidate.fused.article_id.to_string(),
        reason,
    };
    warn!(code = %error.code(), error = %error, "candidate excluded");
    let scored = RerankedCandidate {
        article_id: candidate.fused.article_id.clone(),
        rrf_score: candidate.fused.rrf_score,
        relevance_score: 0.0,
        is_relevant: false,
        reason: error.to_string(),
    };
    (scored, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use chrono::Utc;
    use scoop_core::ArticleId;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers based on which candidate body appears in the prompt.
    struct ByCandidate {
        calls: AtomicUsize,
        respond: fn(&str) -> Result<String, LlmError>,
    }

    impl ByCandidate {
        fn new(respond: fn(&str) -> Result<String, LlmError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                respond,
            }
        }
    }

    impl LanguageModel for ByCandidate {
        fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(request.json_mode);
            (self.respond)(request.prompt)
        }
    }

    fn candidate(id: &str, body: &str, rrf_score: f64) -> CandidateArticle {
        CandidateArticle {
            fused: FusedCandidate {
                article_id: ArticleId::new_unchecked(id),
                rrf_score,
                source_ranks: BTreeMap::new(),
            },
            article: Article {
                id: ArticleId::new_unchecked(id),
                title: String::new(),
                body: body.to_string(),
                published_at: Utc::now(),
                embedding: vec![1.0],
            },
        }
    }

    fn config(workers: usize) -> RerankerConfig {
        RerankerConfig {
            workers,
            ..RerankerConfig::default()
        }
    }

    fn scripted(prompt: &str) -> Result<String, LlmError> {
        if prompt.contains("body-broken") {
            Ok("I would say it is quite relevant".into())
        } else if prompt.contains("body-down") {
            Err(LlmError::Unavailable("timeout".into()))
        } else if prompt.contains("body-low") {
            Ok(r#"{"relevance": 0.2, "reason": "different story"}"#.into())
        } else if prompt.contains("body-edge") {
            Ok(r#"{"relevance": 0.5, "reason": "borderline"}"#.into())
        } else if prompt.contains("body-wild") {
            Ok(r#"{"relevance": 7, "reason": "very"}"#.into())
        } else {
            Ok("```json\n{\"relevance\": 0.9, \"reason\": \"same story\"}\n```".into())
        }
    }

    fn candidates() -> Vec<CandidateArticle> {
        vec![
            candidate("c1", "body-good one", 0.05),
            candidate("c2", "body-broken", 0.04),
            candidate("c3", "body-good two", 0.03),
            candidate("c4", "body-low", 0.02),
            candidate("c5", "body-edge", 0.01),
        ]
    }

    fn relevant_ids(outcome: &RerankOutcome) -> Vec<&str> {
        outcome.relevant().map(|c| c.article_id.as_str()).collect()
    }

    #[test]
    fn one_parse_failure_excludes_only_that_candidate() {
        let model = ByCandidate::new(scripted);
        let reranker = Reranker::new(&model, &config(1), 10);
        let outcome = reranker.rerank("incoming", &candidates());

        assert_eq!(outcome.scored.len(), 5);
        assert_eq!(outcome.failures, 1);
        assert_eq!(relevant_ids(&outcome), vec!["c1", "c3", "c5"]);

        let broken = &outcome.scored[1];
        assert!(!broken.is_relevant);
        assert!(broken.relevance_score.abs() < f64::EPSILON);
        assert!(broken.reason.contains("no JSON object"));
    }

    #[test]
    fn threshold_is_inclusive() {
        let model = ByCandidate::new(scripted);
        let reranker = Reranker::new(&model, &config(1), 10);
        let outcome = reranker.rerank("incoming", &[candidate("edge", "body-edge", 0.1)]);
        assert!(outcome.scored[0].is_relevant);
    }

    #[test]
    fn call_errors_and_out_of_range_scores_fail_closed() {
        let model = ByCandidate::new(scripted);
        let reranker = Reranker::new(&model, &config(1), 10);
        let outcome = reranker.rerank(
            "incoming",
            &[
                candidate("down", "body-down", 0.2),
                candidate("wild", "body-wild", 0.1),
            ],
        );
        assert_eq!(outcome.failures, 2);
        assert_eq!(outcome.relevant().count(), 0);
    }

    #[test]
    fn budget_caps_model_calls() {
        let model = ByCandidate::new(scripted);
        let reranker = Reranker::new(&model, &config(1), 2);
        let outcome = reranker.rerank("incoming", &candidates());
        assert_eq!(outcome.scored.len(), 2);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn worker_pool_preserves_fused_order() {
        let sequential_model = ByCandidate::new(scripted);
        let sequential = Reranker::new(&sequential_model, &config(1), 10).rerank("incoming", &candidates());

        for workers in [2, 3, 8] {
            let model = ByCandidate::new(scripted);
            let parallel = Reranker::new(&model, &config(workers), 10).rerank("incoming", &candidates());
            assert_eq!(parallel, sequential, "workers = {workers}");
            assert_eq!(model.calls.load(Ordering::SeqCst), 5);
        }
    }

    #[test]
    fn no_candidates_means_no_calls() {
        let model = ByCandidate::new(scripted);
        let outcome = Reranker::new(&model, &config(4), 5).rerank("incoming", &[]);
        assert!(outcome.scored.is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }
}
