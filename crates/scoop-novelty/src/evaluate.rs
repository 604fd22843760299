//! Accuracy of recorded decisions against a ground-truth label file.
//!
//! Both files are JSON arrays matched by position. Ground truth drives the
//! total: a missing or failed decision counts as incorrect.

use anyhow::{Context, Result};
use scoop_core::Label;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
struct ExpectedEntry {
    #[serde(alias = "expected", alias = "label")]
    expected_decision: Label,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationRow {
    /// 1-based position in the ground-truth file.
    pub index: usize,
    pub expected: Label,
    /// `None` when the decision entry is missing or carries no label.
    pub got: Option<Label>,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub rows: Vec<EvaluationRow>,
}

fn decision_label(entry: &Value) -> Option<Label> {
    ["label", "decision"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str))
        .and_then(|raw| raw.parse().ok())
}

/// Parse both documents and score them.
///
/// # Errors
///
/// Returns an error if either document is not a JSON array, or a ground-truth
/// entry has no recognizable expected label.
pub fn evaluate(decisions_json: &str, ground_truth_json: &str) -> Result<EvaluationReport> {
    let decisions: Vec<Value> =
        serde_json::from_str(decisions_json).context("decisions must be a JSON array")?;
    let expected: Vec<ExpectedEntry> = serde_json::from_str(ground_truth_json)
        .context("ground truth must be a JSON array of {expected_decision}")?;

    let rows: Vec<EvaluationRow> = expected
        .iter()
        .enumerate()
        .map(|(idx, truth)| {
            let got = decisions.get(idx).and_then(decision_label);
            EvaluationRow {
                index: idx + 1,
                expected: truth.expected_decision,
                got,
                correct: got == Some(truth.expected_decision),
            }
        })
        .collect();

    let total = rows.len();
    let correct = rows.iter().filter(|r| r.correct).count();
    let accuracy = if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    };

    Ok(EvaluationReport {
        total,
        correct,
        accuracy,
        rows,
    })
}
