//! OpenAI-compatible chat completions client (OpenRouter, OpenAI, vLLM, ...).

use std::time::Duration;

use scoop_core::config::LlmConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CompletionRequest, LanguageModel, LlmError};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for `POST {base_url}/chat/completions`.
pub struct OpenAiChatClient {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    json_mode: bool,
}

impl std::fmt::Debug for OpenAiChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl OpenAiChatClient {
    #[must_use]
    pub fn new(config: &LlmConfig, api_key: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            json_mode: config.json_mode,
        }
    }

    fn body<'a>(&'a self, request: &CompletionRequest<'a>) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt,
        });

        ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages,
            response_format: (request.json_mode && self.json_mode).then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

impl LanguageModel for OpenAiChatClient {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let body = self.body(request);
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key.trim()))
            .set("User-Agent", "scoop")
            .send_json(&body)
            .map_err(|error| match error {
                ureq::Error::Status(code, response) => {
                    let text = response.into_string().unwrap_or_default();
                    let message = format!("HTTP {code}: {}", text.trim());
                    if code == 429 || code >= 500 {
                        LlmError::Unavailable(message)
                    } else {
                        LlmError::Rejected(message)
                    }
                }
                ureq::Error::Transport(transport) => LlmError::Unavailable(transport.to_string()),
            })?;

        let parsed: ChatResponse = response
            .into_json()
            .map_err(|err| LlmError::Malformed(err.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LlmError::Malformed("response carried no message content".into()))?;

        debug!(model = %self.model, chars = content.len(), "chat completion");
        Ok(content)
    }
}
