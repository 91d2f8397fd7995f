use crate::domain::model::{ChatMessage, ToolDefinition, ToolOutput};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// 送出完整對話並取回模型的文字回覆
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    fn describe(&self) -> String;
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn definition(&self) -> ToolDefinition;
    /// 放入系統提示的使用與解讀說明
    fn guide(&self) -> &'static str;
    async fn execute(&self, arguments: &serde_json::Value) -> Result<ToolOutput>;
}
