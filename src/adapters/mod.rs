// Adapters layer: concrete implementations for external systems (NORM REST API, LLM backends)

#[cfg(feature = "bedrock")]
pub mod bedrock;
pub mod norm_api;
pub mod openai;

use crate::config::{LlmConfig, LlmProvider};
use crate::domain::ports::LanguageModel;
use crate::utils::error::{AgentError, Result};

/// 依配置建立語言模型後端（同時作為啟動檢查）
pub async fn build_language_model(config: &LlmConfig) -> Result<Box<dyn LanguageModel>> {
    match config.provider {
        LlmProvider::Bedrock => build_bedrock(config).await,
        LlmProvider::OpenAi => {
            let openai = config
                .openai
                .as_ref()
                .ok_or_else(|| AgentError::MissingConfigError {
                    field: "llm.openai".to_string(),
                })?;
            Ok(Box::new(openai::OpenAiCompatibleModel::new(config, openai)))
        }
    }
}

#[cfg(feature = "bedrock")]
async fn build_bedrock(config: &LlmConfig) -> Result<Box<dyn LanguageModel>> {
    Ok(Box::new(bedrock::BedrockModel::from_config(config).await?))
}

#[cfg(not(feature = "bedrock"))]
async fn build_bedrock(_config: &LlmConfig) -> Result<Box<dyn LanguageModel>> {
    Err(AgentError::ConfigError {
        message: "this build was compiled without the 'bedrock' feature".to_string(),
    })
}
