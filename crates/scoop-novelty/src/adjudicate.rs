//! Novelty adjudication: PUBLISH or SKIP against the relevant matches.

use scoop_core::{ArticleId, IncomingArticle, Label, PipelineError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::{CompletionRequest, LanguageModel};
use crate::payload::{PayloadError, parse_payload, unit_score};
use crate::prompts::{NOVELTY_SYSTEM_PROMPT, novelty_prompt};

/// Confidence when retrieval returned nothing at all.
pub const EMPTY_STORE_CONFIDENCE: f64 = 0.95;

/// Confidence when retrieval found candidates but none were relevant.
pub const NO_RELEVANT_MATCH_CONFIDENCE: f64 = 0.90;

/// A stored article judged relevant by the reranker.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevantMatch {
    pub article_id: ArticleId,
    pub text: String,
    pub relevance_score: f64,
}

/// Classifier output before the decision policy runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawVerdict {
    /// Always [`Label::Publish`] or [`Label::Skip`].
    pub label: Label,
    pub confidence: f64,
    pub reasoning: String,
    pub new_information: Vec<String>,
    pub status_change_detected: bool,
    /// `false` for the no-match short circuits.
    pub model_called: bool,
}

/// Verdict for an article with no relevant match; no model call is made.
#[must_use]
pub fn verdict_without_matches(retrieval_found_any: bool) -> RawVerdict {
    let (confidence, reasoning) = if retrieval_found_any {
        (
            NO_RELEVANT_MATCH_CONFIDENCE,
            "Retrieved articles are about different stories. New topic.",
        )
    } else {
        (
            EMPTY_STORE_CONFIDENCE,
            "No similar article in the store.",
        )
    };
    RawVerdict {
        label: Label::Publish,
        confidence,
        reasoning: reasoning.to_string(),
        new_information: Vec::new(),
        status_change_detected: false,
        model_called: false,
    }
}

/// Classification capability; tests substitute deterministic stubs.
pub trait TextClassifier {
    /// Classify `incoming` against a non-empty set of relevant matches.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AdjudicationFailed`] when no valid verdict
    /// could be obtained.
    fn classify(
        &self,
        incoming: &IncomingArticle,
        matches: &[RelevantMatch],
    ) -> Result<RawVerdict, PipelineError>;
}

#[derive(Debug, Deserialize)]
struct NoveltyPayload {
    decision: String,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    new_information: Vec<String>,
    #[serde(default)]
    status_change_detected: bool,
}

fn parse_verdict(text: &str) -> Result<RawVerdict, PayloadError> {
    let payload: NoveltyPayload = parse_payload(text)?;
    let label = match payload.decision.parse::<Label>() {
        Ok(label @ (Label::Publish | Label::Skip)) => label,
        Ok(Label::Review) => {
            return Err(PayloadError::Shape(
                "decision REVIEW is reserved for the decision policy".into(),
            ));
        }
        Err(reason) => return Err(PayloadError::Shape(reason)),
    };
    Ok(RawVerdict {
        label,
        confidence: unit_score("confidence", payload.confidence)?,
        reasoning: payload.reasoning,
        new_information: payload.new_information,
        status_change_detected: payload.status_change_detected,
        model_called: true,
    })
}

/// [`TextClassifier`] backed by a [`LanguageModel`].
pub struct LlmNoveltyClassifier<'a> {
    model: &'a dyn LanguageModel,
    max_attempts: u32,
}

impl std::fmt::Debug for LlmNoveltyClassifier<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmNoveltyClassifier")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl<'a> LlmNoveltyClassifier<'a> {
    #[must_use]
    pub fn new(model: &'a dyn LanguageModel, max_attempts: u32) -> Self {
        Self {
            model,
            max_attempts: max_attempts.max(1),
        }
    }
}

impl TextClassifier for LlmNoveltyClassifier<'_> {
    fn classify(
        &self,
        incoming: &IncomingArticle,
        matches: &[RelevantMatch],
    ) -> Result<RawVerdict, PipelineError> {
        let existing: Vec<&str> = matches.iter().map(|m| m.text.as_str()).collect();
        let prompt = novelty_prompt(&incoming.search_text(), &existing);
        let request = CompletionRequest::json(Some(NOVELTY_SYSTEM_PROMPT), &prompt);

        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            let result = self
                .model
                .complete(&request)
                .map_err(|err| err.to_string())
                .and_then(|text| parse_verdict(&text).map_err(|err| err.to_string()));

            match result {
                Ok(verdict) => {
                    debug!(
                        article_id = %incoming.id,
                        attempt,
                        label = %verdict.label,
                        confidence = verdict.confidence,
                        "novelty verdict"
                    );
                    return Ok(verdict);
                }
                Err(reason) => {
                    warn!(article_id = %incoming.id, attempt, error = %reason, "novelty call failed");
                    last_error = reason;
                }
            }
        }

        Err(PipelineError::AdjudicationFailed {
            attempts: self.max_attempts,
            reason: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use std::sync::Mutex;

    struct Replay(Mutex<Vec<Result<String, LlmError>>>);

    impl Replay {
        fn new(script: Vec<Result<String, LlmError>>) -> Self {
            Self(Mutex::new(script))
        }

        fn remaining(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }

    impl LanguageModel for Replay {
        fn complete(&self, _request: &CompletionRequest<'_>) -> Result<String, LlmError> {
            self.0.lock().unwrap().remove(0)
        }
    }

    fn one_match() -> Vec<RelevantMatch> {
        vec![RelevantMatch {
            article_id: ArticleId::new_unchecked("m1"),
            text: "Club in talks with striker".into(),
            relevance_score: 0.9,
        }]
    }

    fn incoming() -> IncomingArticle {
        IncomingArticle::from_text("Club signs striker for 40m")
    }

    const PUBLISH_JSON: &str = r#"{"decision":"PUBLISH","confidence":0.85,"reasoning":"Deal completed.","new_information":["fee 40m"],"status_change_detected":true}"#;

    #[test]
    fn valid_payload_is_returned() {
        let model = Replay::new(vec![Ok(PUBLISH_JSON.into())]);
        let verdict = LlmNoveltyClassifier::new(&model, 2)
            .classify(&incoming(), &one_match())
            .unwrap();
        assert_eq!(verdict.label, Label::Publish);
        assert!((verdict.confidence - 0.85).abs() < f64::EPSILON);
        assert_eq!(verdict.new_information, vec!["fee 40m"]);
        assert!(verdict.status_change_detected);
        assert!(verdict.model_called);
    }

    #[test]
    fn unparseable_output_is_retried_once() {
        let model = Replay::new(vec![Ok("Definitely publish this.".into()), Ok(PUBLISH_JSON.into())]);
        let verdict = LlmNoveltyClassifier::new(&model, 2)
            .classify(&incoming(), &one_match())
            .unwrap();
        assert_eq!(verdict.label, Label::Publish);
        assert_eq!(model.remaining(), 0);
    }

    #[test]
    fn exhausted_attempts_fail_without_guessing() {
        let model = Replay::new(vec![
            Ok("nope".into()),
            Err(LlmError::Unavailable("timeout".into())),
            Ok(PUBLISH_JSON.into()),
        ]);
        let err = LlmNoveltyClassifier::new(&model, 2)
            .classify(&incoming(), &one_match())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::AdjudicationFailed { attempts: 2, .. }
        ));
        assert!(err.to_string().contains("timeout"));
        assert_eq!(model.remaining(), 1);
    }

    #[test]
    fn review_or_unknown_labels_are_parse_failures() {
        for decision in ["REVIEW", "MAYBE"] {
            let text = format!(r#"{{"decision":"{decision}","confidence":0.9,"reasoning":"x"}}"#);
            assert!(parse_verdict(&text).is_err(), "{decision} accepted");
        }
        assert!(parse_verdict(r#"{"decision":"skip","confidence":0.7}"#).is_ok());
    }

    #[test]
    fn out_of_range_confidence_is_a_parse_failure() {
        assert!(parse_verdict(r#"{"decision":"SKIP","confidence":1.4}"#).is_err());
    }

    #[test]
    fn short_circuits_distinguish_empty_retrieval() {
        let empty = verdict_without_matches(false);
        assert_eq!(empty.label, Label::Publish);
        assert!((empty.confidence - 0.95).abs() < f64::EPSILON);
        assert!(!empty.model_called);

        let unrelated = verdict_without_matches(true);
        assert!((unrelated.confidence - 0.90).abs() < f64::EPSILON);
        assert!(unrelated.reasoning.contains("different stories"));
    }
}
