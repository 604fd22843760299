use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ConfigInvalid,
    StoreUnavailable,
    DimensionMismatch,
    InvalidInput,
    EmbeddingUnavailable,
    SearchFailed,
    RerankCallFailed,
    AdjudicationFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::ConfigInvalid => "E1002",
            Self::StoreUnavailable => "E2001",
            Self::DimensionMismatch => "E2002",
            Self::InvalidInput => "E3001",
            Self::EmbeddingUnavailable => "E4001",
            Self::SearchFailed => "E4002",
            Self::RerankCallFailed => "E4003",
            Self::AdjudicationFailed => "E4004",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::ConfigInvalid => "Config value out of range",
            Self::StoreUnavailable => "Article store unavailable",
            Self::DimensionMismatch => "Embedding space mismatch",
            Self::InvalidInput => "Invalid input record",
            Self::EmbeddingUnavailable => "Embedding provider unavailable",
            Self::SearchFailed => "Search failed",
            Self::RerankCallFailed => "Rerank call failed",
            Self::AdjudicationFailed => "Novelty adjudication failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in scoop.toml and retry."),
            Self::ConfigInvalid => {
                Some("Thresholds must lie in [0, 1]; top_k, rrf_k and dimensions must be positive.")
            }
            Self::StoreUnavailable => Some("Check the --db path and file permissions."),
            Self::DimensionMismatch => Some(
                "The store embedding dimension and model are fixed at creation; re-ingest into a new store to change them.",
            ),
            Self::InvalidInput => Some("Each record needs a non-empty body/text field."),
            Self::EmbeddingUnavailable => {
                Some("Check the embedding provider endpoint and API key, then retry.")
            }
            Self::SearchFailed => Some("Check that the store is reachable and migrated."),
            Self::RerankCallFailed => None,
            Self::AdjudicationFailed => {
                Some("Retry the article; persistent failures usually mean the model ignores the JSON format.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures of the retrieval and adjudication pipeline.
///
/// Candidate-local failures (`RerankCallFailed`) are logged and swallowed by
/// the reranker; article-local failures are reported per article in a batch;
/// `SearchFailed` aborts the whole task.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("embedding unavailable after {attempts} attempt(s): {reason}")]
    EmbeddingUnavailable { attempts: u32, reason: String },

    #[error("search failed: {0:#}")]
    SearchFailed(#[source] anyhow::Error),

    #[error("rerank call failed for {article_id}: {reason}")]
    RerankCallFailed { article_id: String, reason: String },

    #[error("adjudication failed after {attempts} attempt(s): {reason}")]
    AdjudicationFailed { attempts: u32, reason: String },
}

impl PipelineError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::EmbeddingUnavailable { .. } => ErrorCode::EmbeddingUnavailable,
            Self::SearchFailed(_) => ErrorCode::SearchFailed,
            Self::RerankCallFailed { .. } => ErrorCode::RerankCallFailed,
            Self::AdjudicationFailed { .. } => ErrorCode::AdjudicationFailed,
        }
    }

    /// Whether this failure invalidates the whole task rather than one article.
    #[must_use]
    pub const fn aborts_task(&self) -> bool {
        matches!(self, Self::SearchFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, PipelineError};
    use std::collections::HashSet;

    const ALL: [ErrorCode; 10] = [
        ErrorCode::ConfigParseError,
        ErrorCode::ConfigInvalid,
        ErrorCode::StoreUnavailable,
        ErrorCode::DimensionMismatch,
        ErrorCode::InvalidInput,
        ErrorCode::EmbeddingUnavailable,
        ErrorCode::SearchFailed,
        ErrorCode::RerankCallFailed,
        ErrorCode::AdjudicationFailed,
        ErrorCode::InternalUnexpected,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let raw = code.code();
            assert_eq!(raw.len(), 5);
            assert!(raw.starts_with('E'));
            assert!(raw.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn only_search_failures_abort_the_task() {
        let search = PipelineError::SearchFailed(anyhow::anyhow!("disk gone"));
        assert!(search.aborts_task());
        assert_eq!(search.code(), ErrorCode::SearchFailed);

        let adjudication = PipelineError::AdjudicationFailed {
            attempts: 2,
            reason: "no JSON object".into(),
        };
        assert!(!adjudication.aborts_task());
        assert_eq!(adjudication.code().code(), "E4004");

        let embed = PipelineError::EmbeddingUnavailable {
            attempts: 3,
            reason: "timeout".into(),
        };
        assert!(!embed.aborts_task());
        assert!(embed.to_string().contains("3 attempt"));
    }
}
