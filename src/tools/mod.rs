// Tools layer: NORM-backed tools the agent can call by name

pub mod device_info;
pub mod device_report;

use crate::adapters::norm_api::NormClient;
use crate::config::ReportMode;
use crate::domain::model::{ToolCall, ToolDefinition, ToolOutput};
use crate::domain::ports::Tool;
use crate::utils::error::{AgentError, Result};

pub use device_info::GetDeviceInfo;
pub use device_report::GetDeviceReport;

/// 清理並檢查模型給的主機名稱；只接受字母、數字、`.`、`-`、`_`
pub fn checked_hostname(tool: &str, raw: &str) -> Result<String> {
    let hostname = raw.trim();
    let reason = if hostname.is_empty() {
        Some("hostname cannot be empty".to_string())
    } else if hostname.starts_with('.')
        || !hostname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        Some(format!("'{}' is not a valid device hostname", hostname))
    } else {
        None
    };

    match reason {
        Some(message) => Err(AgentError::InvalidToolArguments {
            tool: tool.to_string(),
            message,
        }),
        None => Ok(hostname.to_string()),
    }
}

/// 依名稱查找並執行工具，保留註冊順序
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// get_device_info + get_device_report
    pub fn with_defaults(client: NormClient, report_mode: ReportMode) -> Self {
        Self::new()
            .register(GetDeviceInfo::new(client.clone()))
            .register(GetDeviceReport::new(client, report_mode))
    }

    pub fn register<T: Tool + 'static>(mut self, tool: T) -> Self {
        tracing::debug!("🔧 Registering tool {}", tool.name());
        self.tools.push(Box::new(tool));
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| &**t)
    }

    pub async fn execute(&self, call: &ToolCall) -> Result<ToolOutput> {
        let tool = self.get(&call.name).ok_or_else(|| AgentError::UnknownTool {
            name: call.name.clone(),
            available: self.names(),
        })?;

        tracing::info!("⚙️ Executing {} with {}", call.name, call.arguments);
        tool.execute(&call.arguments).await
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn definitions_json(&self) -> String {
        serde_json::to_string_pretty(&self.definitions()).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn guides(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("=== TOOL: {} ===\n{}\n", t.name(), t.guide()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
