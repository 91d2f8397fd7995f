use crate::config::{LlmConfig, OpenAiConfig};
use crate::domain::model::ChatMessage;
use crate::domain::ports::LanguageModel;
use crate::utils::error::{AgentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI 相容的 /chat/completions 後端（本地 LLM 伺服器）
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleModel {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompatibleModel {
    pub fn new(llm: &LlmConfig, openai: &OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/chat/completions", openai.base_url.trim_end_matches('/')),
            api_key: openai.api_key.clone().filter(|k| !k.is_empty()),
            model: openai.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            timeout: Duration::from_secs(llm.timeout_seconds),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        tracing::debug!("🤖 POST {} ({} messages)", self.endpoint, messages.len());
        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AgentError::ModelAccessDenied {
                message: format!("{} returned {}", self.endpoint, status),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::ModelError {
                message: format!("{} returned {}: {}", self.endpoint, status, text.trim()),
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AgentError::ModelError {
                message: "completion response contained no message content".to_string(),
            })
    }

    fn describe(&self) -> String {
        format!("OpenAI-compatible {} at {}", self.model, self.endpoint)
    }
}
