use crate::adapters::norm_api::NormClient;
use crate::domain::model::{ToolDefinition, ToolOutput};
use crate::domain::ports::Tool;
use crate::tools::checked_hostname;
use crate::utils::error::{AgentError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;

pub const TOOL_NAME: &str = "get_device_info";

const INTERFACE_CLASSES: [&str; 3] = ["TimosVrtrInterface", "JunosInterface", "Interface"];
const SAP_CLASSES: [&str; 2] = ["Sap", "TimosSap"];
const PORT_CLASSES: [&str; 2] = ["TimosPort", "Port"];
const ROLE_TAGS: [&str; 4] = ["CORE", "RESIDENTIAL", "BSOD", "EDGE"];

const GUIDE: &str = r#"TOOL: get_device_info
PURPOSE: Retrieves network device information from the NORM super_search endpoint.

The observation is already interpreted for you. It contains:
- a device header (hostname, hardware model, device type, location, role)
- aggregated component counts (interfaces, SAPs, services, ports, LAGs, networks, satellites)
- connected devices and management networks
- the device tags, which you need for get_device_report

HOW TO DISPLAY RESULTS:
- Present the header, the component summary, connections and management networks
- AGGREGATE similar object types, never list individual objects
- This should be your FINAL ANSWER - do not call other tools
- End with: "Would you like a detailed report for this device?""#;

const USAGE: &str = "Use this tool when the user asks to \"show\" or \"get info\" about a device, or provides just a device name. After using it, give the Final Answer immediately and offer the detailed report. Do NOT call get_device_report automatically.";

#[derive(Debug, Deserialize)]
struct DeviceInfoArgs {
    hostname: String,
}

/// 透過 super_search 取得裝置資訊並整理成摘要
pub struct GetDeviceInfo {
    client: NormClient,
}

impl GetDeviceInfo {
    pub fn new(client: NormClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetDeviceInfo {
    fn name(&self) -> &'static str {
        TOOL_NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: TOOL_NAME,
            description: "Get comprehensive device information including interfaces, services, ports, and SAPs",
            arguments: json!({
                "hostname": "The device hostname to query (e.g., 'SRMECH01')"
            }),
            usage_guide: USAGE,
        }
    }

    fn guide(&self) -> &'static str {
        GUIDE
    }

    async fn execute(&self, arguments: &Value) -> Result<ToolOutput> {
        let args: DeviceInfoArgs =
            serde_json::from_value(arguments.clone()).map_err(|e| {
                AgentError::InvalidToolArguments {
                    tool: TOOL_NAME.to_string(),
                    message: e.to_string(),
                }
            })?;
        let hostname = checked_hostname(TOOL_NAME, &args.hostname)?;
        let hostname = hostname.as_str();

        tracing::info!("🔍 Fetching device info for {}", hostname);
        let data = self.client.super_search(hostname).await.map_err(|e| {
            tracing::error!("Error fetching device info for {}: {}", hostname, e);
            e
        })?;

        let interpretation = interpret(hostname, &data);
        let tags = device_tags(hostname, &data);

        Ok(ToolOutput {
            tool: TOOL_NAME.to_string(),
            hostname: hostname.to_string(),
            data,
            tags,
            interpretation,
        })
    }
}

fn objects(data: &Value) -> &[Value] {
    data.get("data")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn classname(obj: &Value) -> &str {
    obj.get("classname").and_then(Value::as_str).unwrap_or("")
}

fn info_strings(obj: &Value) -> Vec<String> {
    obj.get("additional_info")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(value_text).collect())
        .unwrap_or_default()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn last_of_class<'a>(objects: &'a [Value], class: &str) -> Option<&'a Value> {
    objects.iter().filter(|obj| classname(obj) == class).last()
}

fn count_classes(objects: &[Value], classes: &[&str]) -> usize {
    objects
        .iter()
        .filter(|obj| classes.contains(&classname(obj)))
        .count()
}

/// NormDevice 紀錄的標籤（排除主機名稱本身）
pub fn device_tags(hostname: &str, data: &Value) -> Vec<String> {
    last_of_class(objects(data), "NormDevice")
        .map(|record| {
            let identifier = record
                .get("identifier")
                .and_then(Value::as_str)
                .unwrap_or(hostname);
            info_strings(record)
                .into_iter()
                .filter(|tag| tag != identifier && tag != hostname)
                .collect()
        })
        .unwrap_or_default()
}

/// 將 super_search 結果整理成給模型的觀察文字
pub fn interpret(hostname: &str, data: &Value) -> String {
    let objects = objects(data);
    if objects.is_empty() {
        return format!("No data found for device {}", hostname);
    }

    let mut device_type = "Unknown Device".to_string();
    let mut location = "Unknown Location".to_string();
    let mut role = "Unknown Role".to_string();
    let mut hardware_model = "Unknown Model".to_string();

    if let Some(device) = last_of_class(objects, "NormDevice") {
        let tags: Vec<String> = info_strings(device)
            .into_iter()
            .filter(|tag| tag != hostname)
            .collect();
        let has = |tag: &str| tags.iter().any(|t| t == tag);

        if has("TIMOS") && has("SR") {
            device_type = "TIMOS Service Router".to_string();
        }

        let location_tags: Vec<&str> = tags
            .iter()
            .filter(|t| t.contains("HE_") || t.contains("MECH"))
            .map(String::as_str)
            .collect();
        if !location_tags.is_empty() {
            location = location_tags
                .join(" ")
                .replace("HE_", "Head-End ")
                .replace('_', " ");
        }

        let role_tags: Vec<&str> = tags
            .iter()
            .filter(|t| ROLE_TAGS.contains(&t.as_str()))
            .map(String::as_str)
            .collect();
        if !role_tags.is_empty() {
            role = role_tags.join(" | ");
        }
    }

    if let Some(chassis) = last_of_class(objects, "TimosChassis") {
        if let Some(model) = info_strings(chassis).into_iter().next() {
            hardware_model = model;
        }
    }

    let interfaces = count_classes(objects, &INTERFACE_CLASSES);
    let saps = count_classes(objects, &SAP_CLASSES);
    let services = count_classes(objects, &["TimosService"]);
    let ports = count_classes(objects, &PORT_CLASSES);
    let lags = count_classes(objects, &["TimosLag"]);
    let networks = count_classes(objects, &["Network"]);
    let satellites = count_classes(objects, &["TimosSatellite"]);

    // 來源不是本機的物件視為相連裝置
    let connected: BTreeSet<&str> = objects
        .iter()
        .filter_map(|obj| obj.get("origin").and_then(Value::as_str))
        .filter(|origin| !origin.is_empty() && *origin != hostname && *origin != "None")
        .collect();

    let mut mgmt_networks = Vec::new();
    let mut loopback_ip = None;
    for obj in objects.iter().filter(|obj| classname(obj) == "Network") {
        let identifier = obj.get("identifier").and_then(Value::as_str).unwrap_or("");
        let ip = identifier.replace("default/", "");
        let info = info_strings(obj);

        if info.iter().any(|entry| entry.contains(hostname)) {
            if info.join(" ").to_uppercase().contains("LOOPBACK") {
                loopback_ip = Some(ip);
            } else {
                mgmt_networks.push(ip);
            }
        }
    }

    let mut response = format!("🖥️ {} - {} ({})\n", hostname, hardware_model, device_type);
    response.push_str(&format!("   Location: {}\n", location));
    response.push_str(&format!("   Role: {}\n\n", role));

    response.push_str("📊 Network Components:\n");
    response.push_str(&format!(
        "   • {} Interfaces (customer/service connections)\n",
        interfaces
    ));
    response.push_str(&format!("   • {} SAPs - Service Access Points\n", saps));
    response.push_str(&format!("   • {} Active Services\n", services));
    response.push_str(&format!("   • {} Physical Ports\n", ports));
    response.push_str(&format!("   • {} Link Aggregation Groups\n", lags));
    response.push_str(&format!("   • {} IP Networks\n", networks));
    if satellites > 0 {
        response.push_str(&format!("   • {} Satellite Devices\n", satellites));
    }
    response.push('\n');

    if !connected.is_empty() {
        response.push_str("🔗 Connected Devices:\n");
        for device in connected.iter().take(3) {
            response.push_str(&format!("   • {}\n", device));
        }
        if connected.len() > 3 {
            response.push_str(&format!("   • + {} other devices\n", connected.len() - 3));
        }
        response.push('\n');
    }

    if !mgmt_networks.is_empty() || loopback_ip.is_some() {
        response.push_str("🌍 Management Networks:\n");
        if !mgmt_networks.is_empty() {
            let shown: Vec<&str> = mgmt_networks.iter().take(2).map(String::as_str).collect();
            response.push_str(&format!("   • {}\n", shown.join(", ")));
        }
        if let Some(loopback) = &loopback_ip {
            response.push_str(&format!("   • {} (main loopback)\n", loopback));
        }
        response.push('\n');
    }

    response.push_str("Would you like a detailed report for this device?");
    response
}
