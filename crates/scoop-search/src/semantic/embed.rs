//! Embedding boundary and the retrying gateway in front of it.

use std::time::Duration;

use scoop_core::PipelineError;
use scoop_core::config::{EmbeddingConfig, EmbeddingProviderKind};
use scoop_core::text::truncate_leading_tokens;
use tracing::{debug, warn};

use super::local::{self, HashedEmbedder};
use super::remote::OpenAiEmbeddingClient;

/// Failure of a single embedding call.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Network failure, timeout, rate limit, or server error.
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    /// The provider refused the request (bad key, bad model, bad input).
    #[error("embedding provider rejected the request: {0}")]
    Rejected(String),

    #[error("embedding provider returned a malformed response: {0}")]
    Malformed(String),

    #[error("expected a {expected}-d embedding, provider returned {actual}")]
    Dimension { expected: usize, actual: usize },
}

impl EmbedError {
    /// Only transient failures are worth another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// A text embedding provider.
pub trait Embedder: Send + Sync {
    /// Identifier recorded in the store alongside the dimension.
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Embed one text.
    ///
    /// # Errors
    ///
    /// Returns an [`EmbedError`] describing why the call failed.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each one after.
    pub base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(2).min(16);
        self.base_delay.saturating_mul(1_u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

/// Id of the model the configured provider embeds with.
///
/// Matches [`EmbeddingGateway::model_id`] for a gateway built with
/// [`EmbeddingGateway::from_config`], without needing an API key.
#[must_use]
pub fn configured_model_id(config: &EmbeddingConfig) -> &str {
    match config.provider {
        EmbeddingProviderKind::Local => local::MODEL_ID,
        EmbeddingProviderKind::Remote => &config.model,
    }
}

/// Front door for every embedding in the workspace.
///
/// Truncates input to the leading `max_input_tokens` whitespace tokens,
/// retries transient provider failures, and enforces the configured
/// dimension on every returned vector.
pub struct EmbeddingGateway {
    provider: Box<dyn Embedder>,
    retry: RetryPolicy,
    max_input_tokens: usize,
}

impl std::fmt::Debug for EmbeddingGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingGateway")
            .field("model", &self.provider.model_id())
            .field("dimension", &self.provider.dimension())
            .field("retry", &self.retry)
            .field("max_input_tokens", &self.max_input_tokens)
            .finish()
    }
}

impl EmbeddingGateway {
    #[must_use]
    pub fn new(provider: Box<dyn Embedder>, retry: RetryPolicy, max_input_tokens: usize) -> Self {
        Self {
            provider,
            retry,
            max_input_tokens: max_input_tokens.max(1),
        }
    }

    /// Build the configured provider.
    ///
    /// `api_key` is only consulted for the remote provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote provider is selected without a key.
    pub fn from_config(
        config: &EmbeddingConfig,
        dimension: usize,
        api_key: Option<String>,
    ) -> anyhow::Result<Self> {
        let provider: Box<dyn Embedder> = match config.provider {
            EmbeddingProviderKind::Local => Box::new(HashedEmbedder::new(dimension)),
            EmbeddingProviderKind::Remote => {
                let Some(key) = api_key else {
                    anyhow::bail!(
                        "remote embeddings need an API key in ${}",
                        config.api_key_env
                    );
                };
                Box::new(OpenAiEmbeddingClient::new(
                    &config.base_url,
                    &config.model,
                    key,
                    dimension,
                    Duration::from_secs(config.timeout_secs),
                ))
            }
        };
        let retry = RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        };
        Ok(Self::new(provider, retry, config.max_input_tokens))
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Embed `text`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmbeddingUnavailable`] for empty input, a
    /// non-retryable provider error, or once retries are exhausted.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let input = truncate_leading_tokens(text, self.max_input_tokens);
        if input.is_empty() {
            return Err(PipelineError::EmbeddingUnavailable {
                attempts: 0,
                reason: "cannot embed empty text".into(),
            });
        }

        let expected = self.provider.dimension();
        let mut attempt = 0;
        loop {
            attempt += 1;
            if attempt > 1 {
                std::thread::sleep(self.retry.delay_before(attempt));
            }

            let error = match self.provider.embed(&input) {
                Ok(vector) if vector.len() == expected => {
                    debug!(attempt, model = self.provider.model_id(), "embedded text");
                    return Ok(vector);
                }
                Ok(vector) => EmbedError::Dimension {
                    expected,
                    actual: vector.len(),
                },
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.retry.max_attempts {
                warn!(attempt, error = %error, "embedding failed");
                return Err(PipelineError::EmbeddingUnavailable {
                    attempts: attempt,
                    reason: error.to_string(),
                });
            }
            debug!(attempt, error = %error, "retrying embedding call");
        }
    }
}
