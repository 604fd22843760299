//! Confidence-threshold decision policy.

use scoop_core::Label;
use scoop_core::config::NoveltyConfig;

/// Routes low-confidence verdicts to human review.
///
/// `confidence < threshold` yields [`Label::Review`]; equality passes the
/// model's label through. A NaN confidence compares as below any threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    threshold: f64,
}

impl DecisionPolicy {
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    #[must_use]
    pub const fn from_config(config: &NoveltyConfig) -> Self {
        Self::new(config.confidence_threshold)
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Final label for a model label at the given confidence.
    #[must_use]
    pub fn decide(&self, model_label: Label, confidence: f64) -> Label {
        if confidence >= self.threshold {
            model_label
        } else {
            Label::Review
        }
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::from_config(&NoveltyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn threshold_table() {
        let policy = DecisionPolicy::default();
        let cases = [
            (0.0, Label::Review),
            (0.59, Label::Review),
            (0.6, Label::Publish),
            (0.61, Label::Publish),
            (1.0, Label::Publish),
        ];
        for (confidence, expected) in cases {
            assert_eq!(policy.decide(Label::Publish, confidence), expected, "{confidence}");
        }
    }

    #[test]
    fn skip_is_downgraded_the_same_way() {
        let policy = DecisionPolicy::new(0.6);
        assert_eq!(policy.decide(Label::Skip, 0.3), Label::Review);
        assert_eq!(policy.decide(Label::Skip, 0.9), Label::Skip);
    }

    #[test]
    fn nan_confidence_goes_to_review() {
        assert_eq!(DecisionPolicy::default().decide(Label::Skip, f64::NAN), Label::Review);
    }

    proptest! {
        #[test]
        fn policy_is_total_and_monotone(confidence in 0.0_f64..=1.0, threshold in 0.0_f64..=1.0) {
            let policy = DecisionPolicy::new(threshold);
            let label = policy.decide(Label::Publish, confidence);
            prop_assert!(label == Label::Publish || label == Label::Review);
            prop_assert_eq!(label == Label::Review, confidence < threshold);
        }
    }
}
