//! 從模型回覆中擷取工具呼叫
//!
//! 支援兩種寫法：`<tool_call>{...}</tool_call>` 與 ```` ```tool_call ```` 區塊。

use crate::domain::model::ToolCall;
use regex::Regex;
use std::sync::OnceLock;

fn patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?s)<tool_call>\s*(\{.*?\})\s*</tool_call>")
                .unwrap_or_else(|e| unreachable!("invalid tool_call pattern: {e}")),
            Regex::new(r"(?s)```tool_call\s*(\{.*?\})\s*```")
                .unwrap_or_else(|e| unreachable!("invalid tool_call pattern: {e}")),
        ]
    })
}

fn decode(raw: &str) -> Option<ToolCall> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("⚠️ Failed to parse tool call JSON: {}", e);
            tracing::debug!("Failed JSON string: {}", raw);
            return None;
        }
    };

    if value.get("name").and_then(|n| n.as_str()).is_none() {
        tracing::debug!("Ignoring tool call without a name: {}", raw);
        return None;
    }

    match serde_json::from_value(value) {
        Ok(call) => Some(call),
        Err(e) => {
            tracing::warn!("⚠️ Tool call has an unexpected shape: {}", e);
            None
        }
    }
}

/// 第一個有效的工具呼叫
pub fn parse_tool_call(response: &str) -> Option<ToolCall> {
    patterns().iter().find_map(|pattern| {
        pattern
            .captures_iter(response)
            .find_map(|caps| caps.get(1).and_then(|m| decode(m.as_str())))
    })
}

/// 所有有效的工具呼叫，先 XML 形式再 fenced 形式
pub fn find_all_tool_calls(response: &str) -> Vec<ToolCall> {
    patterns()
        .iter()
        .flat_map(|pattern| pattern.captures_iter(response))
        .filter_map(|caps| caps.get(1).and_then(|m| decode(m.as_str())))
        .collect()
}

/// 以名稱加上參數 JSON 作為去重用的鍵
///
/// serde_json 的 Map 預設依鍵排序，參數順序不同仍會得到同一個鍵。
pub fn tool_id(call: &ToolCall) -> String {
    format!("{}_{}", call.name, call.arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_xml_tool_call() {
        let response = r#"Thought: look it up
Action:
<tool_call>
{"name": "get_device_info", "arguments": {"hostname": "SRMECH01"}, "id": 1}
</tool_call>"#;

        let call = parse_tool_call(response).unwrap();
        assert_eq!(call.name, "get_device_info");
        assert_eq!(call.argument_str("hostname"), Some("SRMECH01"));
        assert_eq!(call.id, Some(json!(1)));
    }

    #[test]
    fn test_parse_fenced_tool_call() {
        let response = "Action:\n```tool_call\n{\"name\": \"get_device_report\", \"arguments\": {\"hostname\": \"CEAWPDGA05\", \"tags\": [\"CE\", \"COMWARE\"]}}\n```";

        let call = parse_tool_call(response).unwrap();
        assert_eq!(call.name, "get_device_report");
        assert_eq!(call.arguments["tags"], json!(["CE", "COMWARE"]));
    }

    #[test]
    fn test_missing_arguments_default_to_empty_object() {
        let call = parse_tool_call(r#"<tool_call>{"name": "get_device_info"}</tool_call>"#).unwrap();
        assert_eq!(call.arguments, json!({}));
    }

    #[test]
    fn test_invalid_calls_are_skipped() {
        let response = r#"<tool_call>{not json}</tool_call>
<tool_call>{"arguments": {"hostname": "X"}}</tool_call>
<tool_call>{"name": "get_device_info", "arguments": {"hostname": "X"}}</tool_call>"#;

        let call = parse_tool_call(response).unwrap();
        assert_eq!(call.argument_str("hostname"), Some("X"));
        assert_eq!(find_all_tool_calls(response).len(), 1);
    }

    #[test]
    fn test_no_tool_call() {
        assert!(parse_tool_call("Final Answer: all good").is_none());
        assert!(find_all_tool_calls("Final Answer: all good").is_empty());
    }

    #[test]
    fn test_find_all_orders_xml_before_fenced() {
        let response = r#"```tool_call
{"name": "b", "arguments": {}}
```
<tool_call>{"name": "a", "arguments": {}}</tool_call>"#;

        let names: Vec<String> = find_all_tool_calls(response)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_tool_id_ignores_argument_order() {
        let a = ToolCall::new("get_device_report", json!({"hostname": "H", "tags": ["CE"]}));
        let b = ToolCall::new("get_device_report", json!({"tags": ["CE"], "hostname": "H"}));
        let c = ToolCall::new("get_device_report", json!({"hostname": "G", "tags": ["CE"]}));

        assert_eq!(tool_id(&a), tool_id(&b));
        assert_ne!(tool_id(&a), tool_id(&c));
        assert!(tool_id(&a).starts_with("get_device_report_"));
    }
}
