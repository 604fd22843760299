use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::article::ArticleId;

/// Final editorial label for an incoming article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    /// Materially new information; publish.
    Publish,
    /// Same information as existing coverage; skip.
    Skip,
    /// Confidence too low to act automatically; a human editor decides.
    ///
    /// Only ever produced by the decision policy, never by the model.
    Review,
}

impl Label {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "PUBLISH",
            Self::Skip => "SKIP",
            Self::Review => "REVIEW",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PUBLISH" => Ok(Self::Publish),
            "SKIP" => Ok(Self::Skip),
            "REVIEW" => Ok(Self::Review),
            other => Err(format!("unknown label '{other}'")),
        }
    }
}

/// Best-matching stored article considered during adjudication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopMatch {
    pub article_id: ArticleId,
    pub relevance_score: f64,
}

/// Persisted outcome of one novelty assessment.
///
/// Verdicts are append-only: re-assessing the same article creates a new row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoveltyVerdict {
    /// Row id assigned by the store; `None` until persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict_id: Option<i64>,
    pub incoming_article_id: ArticleId,
    pub incoming_text: String,
    pub label: Label,
    /// Label chosen by the model before the confidence policy ran.
    ///
    /// `None` when no model call was needed (no relevant matches).
    pub model_label: Option<Label>,
    pub confidence: f64,
    pub reasoning: String,
    /// Relevant matches handed to the adjudicator, in fused order.
    pub matched_article_ids: Vec<ArticleId>,
    #[serde(default)]
    pub new_information: Vec<String>,
    #[serde(default)]
    pub status_change_detected: bool,
    pub top_match: Option<TopMatch>,
    pub created_at: DateTime<Utc>,
}

impl NoveltyVerdict {
    /// Whether the decision policy overrode the model's label.
    #[must_use]
    pub fn was_downgraded(&self) -> bool {
        self.label == Label::Review && self.model_label.is_some_and(|l| l != Label::Review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Label::Publish).unwrap(), "\"PUBLISH\"");
        assert_eq!(serde_json::to_string(&Label::Review).unwrap(), "\"REVIEW\"");
        let parsed: Label = serde_json::from_str("\"SKIP\"").unwrap();
        assert_eq!(parsed, Label::Skip);
    }

    #[test]
    fn label_from_str_is_case_insensitive() {
        assert_eq!(" publish ".parse::<Label>(), Ok(Label::Publish));
        assert_eq!("Skip".parse::<Label>(), Ok(Label::Skip));
        assert!("maybe".parse::<Label>().is_err());
    }

    #[test]
    fn downgrade_detection() {
        let mut verdict = NoveltyVerdict {
            verdict_id: None,
            incoming_article_id: ArticleId::new_unchecked("art-1"),
            incoming_text: "text".into(),
            label: Label::Review,
            model_label: Some(Label::Publish),
            confidence: 0.4,
            reasoning: "unsure".into(),
            matched_article_ids: vec![],
            new_information: vec![],
            status_change_detected: false,
            top_match: None,
            created_at: Utc::now(),
        };
        assert!(verdict.was_downgraded());

        verdict.label = Label::Publish;
        assert!(!verdict.was_downgraded());

        verdict.label = Label::Review;
        verdict.model_label = None;
        assert!(!verdict.was_downgraded());
    }
}
