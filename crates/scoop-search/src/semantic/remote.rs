//! OpenAI-compatible `/embeddings` client.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::embed::{EmbedError, Embedder};

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Blocking HTTP client for `POST {base_url}/embeddings`.
pub struct OpenAiEmbeddingClient {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
    dimension: usize,
}

impl std::fmt::Debug for OpenAiEmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbeddingClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbeddingClient {
    #[must_use]
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: String,
        dimension: usize,
        timeout: Duration,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
            dimension,
        }
    }
}

/// Map a ureq failure onto the retry classification.
fn classify_http_error(error: ureq::Error) -> EmbedError {
    match error {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            let message = format!("HTTP {code}: {}", body.trim());
            if code == 429 || code >= 500 {
                EmbedError::Unavailable(message)
            } else {
                EmbedError::Rejected(message)
            }
        }
        ureq::Error::Transport(transport) => EmbedError::Unavailable(transport.to_string()),
    }
}

impl Embedder for OpenAiEmbeddingClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("User-Agent", "scoop")
            .send_json(json!({ "model": self.model, "input": text }))
            .map_err(classify_http_error)?;

        let parsed: EmbeddingResponse = response
            .into_json()
            .map_err(|err| EmbedError::Malformed(err.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|datum| datum.embedding)
            .ok_or_else(|| EmbedError::Malformed("response carried no embedding".into()))
    }
}
