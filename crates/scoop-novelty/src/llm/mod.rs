//! Language model boundary.

pub mod openai;

pub use openai::OpenAiChatClient;

/// One completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionRequest<'a> {
    pub system: Option<&'a str>,
    pub prompt: &'a str,
    /// Ask the provider to constrain output to a JSON object.
    pub json_mode: bool,
}

impl<'a> CompletionRequest<'a> {
    #[must_use]
    pub const fn json(system: Option<&'a str>, prompt: &'a str) -> Self {
        Self {
            system,
            prompt,
            json_mode: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Network failure, timeout, rate limit, or server error.
    #[error("language model unavailable: {0}")]
    Unavailable(String),

    #[error("language model rejected the request: {0}")]
    Rejected(String),

    #[error("language model returned a malformed response: {0}")]
    Malformed(String),
}

/// A chat-style text completion service.
///
/// Implementations must be shareable across the reranker's worker threads.
pub trait LanguageModel: Send + Sync {
    /// Run one completion and return the raw assistant text.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the call fails or the response has no text.
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError>;
}

impl<T: LanguageModel + ?Sized> LanguageModel for &T {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        (**self).complete(request)
    }
}
