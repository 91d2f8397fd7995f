use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// 從模型輸出解析出的工具呼叫
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
}

fn empty_arguments() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
            id: None,
        }
    }

    pub fn argument_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// 工具成功執行的結果
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    pub tool: String,
    pub hostname: String,
    pub data: serde_json::Value,
    /// 裝置標籤（僅 get_device_info 會填入）
    pub tags: Vec<String>,
    pub interpretation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Timos,
    Comware,
}

impl DeviceKind {
    /// 依標籤判斷裝置類型，大小寫不敏感；CE + COMWARE 優先
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Option<Self> {
        let lower: Vec<String> = tags.iter().map(|t| t.as_ref().to_lowercase()).collect();
        let has = |tag: &str| lower.iter().any(|t| t == tag);

        if has("ce") && has("comware") {
            Some(DeviceKind::Comware)
        } else if has("timos") && has("core") {
            Some(DeviceKind::Timos)
        } else {
            None
        }
    }

    /// NORM view 路徑片段
    pub fn path_segment(&self) -> &'static str {
        match self {
            DeviceKind::Timos => "timos",
            DeviceKind::Comware => "comware",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Timos => f.write_str("TIMOS"),
            DeviceKind::Comware => f.write_str("COMWARE"),
        }
    }
}

/// 最近一次 get_device_info 查詢到的裝置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceContext {
    pub hostname: String,
    pub tags: Vec<String>,
}

/// 系統提示中描述工具的定義
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: serde_json::Value,
    pub usage_guide: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_kind_from_tags() {
        assert_eq!(
            DeviceKind::from_tags(&["VPRN", "CPE", "COMWARE", "CE"]),
            Some(DeviceKind::Comware)
        );
        assert_eq!(
            DeviceKind::from_tags(&["timos", "Core", "SR"]),
            Some(DeviceKind::Timos)
        );
        assert_eq!(DeviceKind::from_tags(&["TIMOS"]), None);
        // 兩組都符合時以 COMWARE 為準
        assert_eq!(
            DeviceKind::from_tags(&["TIMOS", "CORE", "CE", "COMWARE"]),
            Some(DeviceKind::Comware)
        );
    }

    #[test]
    fn test_tool_call_defaults_arguments() {
        let call: ToolCall = serde_json::from_str(r#"{"name": "get_device_info"}"#).unwrap();
        assert!(call.arguments.as_object().unwrap().is_empty());
        assert!(call.id.is_none());
    }
}
