use crate::config::LlmConfig;
use crate::domain::model::{ChatMessage, Role};
use crate::domain::ports::LanguageModel;
use crate::utils::error::{AgentError, Result};
use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_bedrockruntime::config::Region;
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockruntime::operation::converse::ConverseError;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, InferenceConfiguration, Message, SystemContentBlock,
};
use aws_sdk_bedrockruntime::Client as BedrockClient;
use std::time::Duration;

/// AWS Bedrock Converse API 後端
#[derive(Debug, Clone)]
pub struct BedrockModel {
    client: BedrockClient,
    model_id: String,
    region: String,
    temperature: f32,
    max_tokens: u32,
}

impl BedrockModel {
    /// 建立 SDK 客戶端；找不到任何憑證提供者時回傳 CredentialsError
    pub async fn from_config(config: &LlmConfig) -> Result<Self> {
        let timeout = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(config.timeout_seconds))
            .build();

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .timeout_config(timeout)
            .load()
            .await;

        if sdk_config.credentials_provider().is_none() {
            return Err(AgentError::CredentialsError {
                message: "no AWS credentials provider is configured".to_string(),
            });
        }

        tracing::debug!(
            "Bedrock client ready (region: {}, model: {})",
            config.aws_region,
            config.model_id
        );

        Ok(Self {
            client: BedrockClient::new(&sdk_config),
            model_id: config.model_id.clone(),
            region: config.aws_region.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl LanguageModel for BedrockModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let (system, turns) = merge_turns(messages);

        let inference = InferenceConfiguration::builder()
            .temperature(self.temperature)
            .max_tokens(i32::try_from(self.max_tokens).unwrap_or(i32::MAX))
            .build();

        let mut request = self
            .client
            .converse()
            .model_id(&self.model_id)
            .inference_config(inference);

        if !system.is_empty() {
            request = request.system(SystemContentBlock::Text(system.join("\n\n")));
        }

        for (role, text) in turns {
            let role = match role {
                Role::Assistant => ConversationRole::Assistant,
                _ => ConversationRole::User,
            };
            let message = Message::builder()
                .role(role)
                .content(ContentBlock::Text(text))
                .build()
                .map_err(|e| AgentError::ModelError {
                    message: format!("Failed to build Bedrock message: {}", e),
                })?;
            request = request.messages(message);
        }

        let output = request.send().await.map_err(map_converse_error)?;

        let text = output
            .output()
            .and_then(|o| o.as_message().ok())
            .map(|message| {
                message
                    .content()
                    .iter()
                    .filter_map(|block| block.as_text().ok())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AgentError::ModelError {
                message: format!("Bedrock returned no text (stop reason: {:?})", output.stop_reason()),
            });
        }

        Ok(text)
    }

    fn describe(&self) -> String {
        format!("AWS Bedrock {} ({})", self.model_id, self.region)
    }
}

fn map_converse_error(err: SdkError<ConverseError>) -> AgentError {
    let detail = DisplayErrorContext(&err).to_string();
    let service = err.into_service_error();

    if service.is_access_denied_exception() {
        return AgentError::ModelAccessDenied {
            message: service
                .message()
                .unwrap_or("access to the model was denied")
                .to_string(),
        };
    }
    if detail.to_lowercase().contains("credential") {
        return AgentError::CredentialsError { message: detail };
    }

    AgentError::ModelError {
        message: service.message().map(str::to_string).unwrap_or(detail),
    }
}

/// Converse 要求 user/assistant 交替且以 user 開頭：
/// system 訊息另外收集，連續同角色訊息合併，開頭的 assistant 訊息捨棄
pub(crate) fn merge_turns(messages: &[ChatMessage]) -> (Vec<String>, Vec<(Role, String)>) {
    let mut system = Vec::new();
    let mut turns: Vec<(Role, String)> = Vec::new();

    for message in messages {
        match message.role {
            Role::System => system.push(message.content.clone()),
            role => {
                if turns.is_empty() && role == Role::Assistant {
                    continue;
                }
                match turns.last_mut() {
                    Some((last_role, text)) if *last_role == role => {
                        text.push_str("\n\n");
                        text.push_str(&message.content);
                    }
                    _ => turns.push((role, message.content.clone())),
                }
            }
        }
    }

    (system, turns)
}
