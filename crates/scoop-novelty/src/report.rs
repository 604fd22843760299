//! Summary over persisted verdicts.

use scoop_core::{Label, NoveltyVerdict};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub total: usize,
    pub publish: usize,
    pub skip: usize,
    pub review: usize,
    /// Verdicts the decision policy moved to REVIEW.
    pub downgraded: usize,
    pub status_changes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfidenceStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Everything `scoop report` prints or writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerdictReport {
    pub counts: LabelCounts,
    /// `None` when there are no verdicts.
    pub confidence: Option<ConfidenceStats>,
    /// Mean relevance of the top match over verdicts that had one.
    pub mean_top_match_relevance: Option<f64>,
    /// Most recent first.
    pub verdicts: Vec<NoveltyVerdict>,
}

impl VerdictReport {
    #[must_use]
    pub fn from_verdicts(verdicts: Vec<NoveltyVerdict>) -> Self {
        let mut counts = LabelCounts {
            total: verdicts.len(),
            ..LabelCounts::default()
        };
        for verdict in &verdicts {
            match verdict.label {
                Label::Publish => counts.publish += 1,
                Label::Skip => counts.skip += 1,
                Label::Review => counts.review += 1,
            }
            if verdict.was_downgraded() {
                counts.downgraded += 1;
            }
            if verdict.status_change_detected {
                counts.status_changes += 1;
            }
        }

        let confidence = (!verdicts.is_empty()).then(|| {
            let (sum, min, max) = verdicts.iter().fold(
                (0.0, f64::INFINITY, f64::NEG_INFINITY),
                |(sum, min, max), v| (sum + v.confidence, min.min(v.confidence), max.max(v.confidence)),
            );
            ConfidenceStats {
                mean: sum / verdicts.len() as f64,
                min,
                max,
            }
        });

        let relevances: Vec<f64> = verdicts
            .iter()
            .filter_map(|v| v.top_match.as_ref().map(|m| m.relevance_score))
            .collect();
        let mean_top_match_relevance = (!relevances.is_empty())
            .then(|| relevances.iter().sum::<f64>() / relevances.len() as f64);

        Self {
            counts,
            confidence,
            mean_top_match_relevance,
            verdicts,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.counts.total == 0
    }
}
