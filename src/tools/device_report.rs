use crate::adapters::norm_api::NormClient;
use crate::config::ReportMode;
use crate::core::formatter;
use crate::domain::model::{DeviceKind, ToolDefinition, ToolOutput};
use crate::domain::ports::Tool;
use crate::tools::checked_hostname;
use crate::utils::error::{AgentError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

pub const TOOL_NAME: &str = "get_device_report";

const GUIDE: &str = r#"TOOL: get_device_report
PURPOSE: Retrieves a detailed device report based on device type (TIMOS or COMWARE)

WHEN TO USE THIS TOOL:
- ONLY when the user explicitly asks for a "detailed report" or "full details"
- ONLY when the user responds "yes" after you offered a detailed report
- NEVER call this automatically after get_device_info

Pass the hostname and the device tags reported by get_device_info:
- TIMOS devices carry the tags TIMOS and CORE
- COMWARE devices carry the tags CE and COMWARE

HOW TO DISPLAY RESULTS:
1. System overview: hostname and model, software version, uptime (TIMOS) or location (COMWARE)
2. Key metrics: interface totals with up/down counts, services (TIMOS) or VLANs (COMWARE), alarms
3. Present the data only; do not ask follow-up questions

ERROR HANDLING:
- 409 Conflict: wrong device type - try the other tag combination
- 404 Not Found: device does not exist in this category
- 500 Server Error: API issue, retry or check the device name"#;

const USAGE: &str = "Use this tool when the user wants a \"detailed report\" or \"full details\", or says \"yes\" after you offered one. You must know the device type first: use the tags from the get_device_info observation (['TIMOS', 'CORE'] for TIMOS routers, ['CE', 'COMWARE'] for COMWARE devices). If you get a 409 error, try the other tag combination.";

/// 標籤可以是陣列，也容許模型給逗號分隔字串
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagsArg {
    List(Vec<String>),
    Csv(String),
}

impl TagsArg {
    fn into_tags(self) -> Vec<String> {
        match self {
            TagsArg::List(tags) => tags,
            TagsArg::Csv(text) => text
                .split(',')
                .map(|t| t.trim().trim_matches(|c| c == '\'' || c == '"' || c == '[' || c == ']'))
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeviceReportArgs {
    hostname: String,
    #[serde(default = "no_tags")]
    tags: TagsArg,
}

fn no_tags() -> TagsArg {
    TagsArg::List(Vec::new())
}

pub struct GetDeviceReport {
    client: NormClient,
    report_mode: ReportMode,
}

impl GetDeviceReport {
    pub fn new(client: NormClient, report_mode: ReportMode) -> Self {
        Self { client, report_mode }
    }

    async fn fetch(&self, kind: DeviceKind, hostname: &str) -> Result<Value> {
        match (kind, self.report_mode) {
            (DeviceKind::Timos, ReportMode::Composite) => {
                self.client.timos_composite(hostname).await
            }
            // composite 模式下 COMWARE 報告也用分段格式呈現
            (DeviceKind::Comware, ReportMode::Composite) => {
                let detail = self.client.view_detail(kind, hostname).await?;
                Ok(json!({ "comware_detail": detail, "report_type": "comware_ce" }))
            }
            (_, ReportMode::Detail) => self.client.view_detail(kind, hostname).await,
        }
    }
}

#[async_trait]
impl Tool for GetDeviceReport {
    fn name(&self) -> &'static str {
        TOOL_NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: TOOL_NAME,
            description: "Get detailed device report with system info, interfaces, services, and alarms",
            arguments: json!({
                "hostname": "The device hostname",
                "tags": "List of device tags - use ['TIMOS', 'CORE'] for TIMOS devices or ['CE', 'COMWARE'] for COMWARE devices"
            }),
            usage_guide: USAGE,
        }
    }

    fn guide(&self) -> &'static str {
        GUIDE
    }

    async fn execute(&self, arguments: &Value) -> Result<ToolOutput> {
        let args: DeviceReportArgs =
            serde_json::from_value(arguments.clone()).map_err(|e| {
                AgentError::InvalidToolArguments {
                    tool: TOOL_NAME.to_string(),
                    message: e.to_string(),
                }
            })?;
        let hostname = checked_hostname(TOOL_NAME, &args.hostname)?;
        let tags = args.tags.into_tags();

        let kind = DeviceKind::from_tags(&tags).ok_or_else(|| AgentError::ToolError {
            tool: TOOL_NAME.to_string(),
            message: format!(
                "Unknown device type for tags: {}. Use ['TIMOS', 'CORE'] or ['CE', 'COMWARE']",
                tag_list(&tags)
            ),
        })?;

        tracing::info!("📋 Fetching {} device report for {}", kind, hostname);

        let data = self
            .fetch(kind, &hostname)
            .await
            .map_err(|e| report_error(&hostname, kind, e))?;

        let interpretation = interpret(&hostname, kind, &data);

        Ok(ToolOutput {
            tool: TOOL_NAME.to_string(),
            hostname,
            data,
            tags,
            interpretation,
        })
    }
}

/// ['A', 'B'] 形式，與提示文字中的標籤寫法一致
fn tag_list(tags: &[String]) -> String {
    let quoted: Vec<String> = tags.iter().map(|t| format!("'{}'", t)).collect();
    format!("[{}]", quoted.join(", "))
}

/// 將 HTTP 狀態碼轉成對模型有用的提示
fn report_error(hostname: &str, kind: DeviceKind, err: AgentError) -> AgentError {
    let message = match &err {
        AgentError::DeviceApiError {
            status: Some(409), ..
        } => format!(
            "Device type mismatch for {}. Try different tags: ['TIMOS', 'CORE'] or ['CE', 'COMWARE']",
            hostname
        ),
        AgentError::DeviceApiError {
            status: Some(404), ..
        } => format!("Device {} not found in the {} category", hostname, kind),
        AgentError::DeviceApiError {
            status: Some(code),
            message,
        } => format!("HTTP Error {}: {}", code, message),
        other => other.to_string(),
    };

    tracing::error!("Error fetching device report for {}: {}", hostname, message);
    AgentError::ToolError {
        tool: TOOL_NAME.to_string(),
        message,
    }
}

pub fn interpret(hostname: &str, kind: DeviceKind, data: &Value) -> String {
    if data.get("report_type").is_some() {
        return formatter::format_device_report(data);
    }
    match kind {
        DeviceKind::Timos => format_timos_report(hostname, data),
        DeviceKind::Comware => format_comware_report(hostname, data),
    }
}

fn array<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn text_or<'a>(data: &'a Value, key: &str, fallback: &'a str) -> String {
    match data.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => fallback.to_string(),
        Some(other) => other.to_string(),
    }
}

fn count_where(items: &[Value], key: &str, expected: &str) -> usize {
    items
        .iter()
        .filter(|item| item.get(key).and_then(Value::as_str) == Some(expected))
        .count()
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn format_timos_report(hostname: &str, data: &Value) -> String {
    let empty = Value::Null;
    let system_info = data.get("system_info").unwrap_or(&empty);
    let services = data.get("services").unwrap_or(&empty);
    let interfaces = array(data, "interfaces");
    let alarms = array(data, "alarms");

    let up_count = count_where(interfaces, "status", "up");
    let down_count = interfaces.len() - up_count;

    let vpls = array(services, "vpls").len();
    let vprn = array(services, "vprn").len();
    let ies = array(services, "ies").len();

    let critical = count_where(alarms, "severity", "critical");
    let minor = count_where(alarms, "severity", "minor");

    let mut response = format!(
        "{} - {}\n",
        hostname,
        text_or(system_info, "model", "Nokia Router")
    );
    response.push_str(&format!("Software: {}\n", text_or(system_info, "version", "Unknown")));
    response.push_str(&format!("Uptime: {}\n\n", text_or(system_info, "uptime", "Unknown")));
    response.push_str("Status Summary:\n");
    response.push_str(&format!(
        "- Interfaces: {} total ({} up, {} down)\n",
        interfaces.len(),
        up_count,
        down_count
    ));
    response.push_str(&format!(
        "- Services: {} active ({} VPLS, {} VPRN, {} IES)\n",
        vpls + vprn + ies,
        vpls,
        vprn,
        ies
    ));
    response.push_str(&format!("- Alarms: {} minor, {} critical", minor, critical));
    response
}

fn format_comware_report(hostname: &str, data: &Value) -> String {
    let empty = Value::Null;
    let device_info = data.get("device_info").unwrap_or(&empty);
    let routing = data.get("routing").unwrap_or(&empty);
    let interfaces = array(data, "interfaces");
    let vlans = array(data, "vlans");

    let up_count = count_where(interfaces, "status", "up");
    let down_count = interfaces.len() - up_count;

    let mut response = format!(
        "{} - {}\n",
        hostname,
        text_or(device_info, "model", "H3C Switch")
    );
    response.push_str(&format!("Software: {}\n", text_or(device_info, "version", "Unknown")));
    response.push_str(&format!("Location: {}\n\n", text_or(device_info, "location", "Unknown")));
    response.push_str("Configuration Summary:\n");
    response.push_str(&format!(
        "- Interfaces: {} total ({} up, {} down)\n",
        interfaces.len(),
        up_count,
        down_count
    ));
    response.push_str(&format!("- VLANs: {} configured", vlans.len()));

    let protocols: Vec<&str> = [("ospf", "OSPF"), ("bgp", "BGP")]
        .into_iter()
        .filter(|(key, _)| is_truthy(routing.get(*key)))
        .map(|(_, label)| label)
        .collect();
    if !protocols.is_empty() {
        response.push_str(&format!("\n- Routing: {} enabled", protocols.join(", ")));
    }

    response
}
