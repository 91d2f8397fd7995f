//! 將 NORM 原始 JSON 轉成分段的可讀文字。
//!
//! `format_super_search` 產生裝置總覽（norm-probe 使用），
//! `format_device_report` 呈現 composite 模式下的多區段報告。

use serde_json::Value;

const SECTION_RULE: &str = "----------------------------------------";
const REPORT_RULE: &str =
    "============================================================";

const COMWARE_KNOWN_KEYS: [&str; 7] = [
    "hostname",
    "model",
    "vendor",
    "interfaces",
    "vrfs",
    "last_discovered",
    "cpe_details",
];

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn info_at(item: &Value, index: usize) -> Option<String> {
    item.get("additional_info")
        .and_then(Value::as_array)
        .and_then(|info| info.get(index))
        .map(text)
}

fn str_field<'a>(item: &'a Value, key: &str) -> &'a str {
    item.get(key).and_then(Value::as_str).unwrap_or("")
}

/// super_search 回應的裝置總覽
pub fn format_super_search(response: &Value) -> String {
    let items = response
        .get("data")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    if items.is_empty() {
        return "No results found for the search term.".to_string();
    }

    let mut device: Option<(String, Vec<String>)> = None;
    let mut network: Option<[String; 3]> = None;
    let mut chassis_model: Option<String> = None;
    let mut interfaces: Vec<String> = Vec::new();
    let mut connections: Vec<[String; 4]> = Vec::new();

    for item in items {
        let identifier = str_field(item, "identifier");
        match str_field(item, "classname") {
            "NormDevice" => {
                let tags = item
                    .get("additional_info")
                    .and_then(Value::as_array)
                    .map(|info| {
                        info.iter()
                            .map(text)
                            .filter(|tag| tag != identifier)
                            .collect()
                    })
                    .unwrap_or_default();
                device = Some((identifier.to_string(), tags));
            }
            "Network" => {
                let or_na = |i| info_at(item, i).unwrap_or_else(|| "N/A".to_string());
                network = Some([or_na(1), or_na(2), or_na(3)]);
            }
            "ComwareInterface" | "TimosVrtrInterface" => interfaces.push(identifier.to_string()),
            "ComwareEntPhysical" if str_field(item, "groupname") == "Chassis" => {
                chassis_model = Some(info_at(item, 1).unwrap_or_else(|| "Unknown".to_string()));
            }
            "TimosSap" => {
                let info_len = item
                    .get("additional_info")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                if info_len >= 9 {
                    connections.push([
                        identifier.to_string(),
                        str_field(item, "origin").to_string(),
                        info_at(item, 3).unwrap_or_else(|| "N/A".to_string()),
                        info_at(item, 8).unwrap_or_else(|| "N/A".to_string()),
                    ]);
                }
            }
            _ => {}
        }
    }

    let mut output: Vec<String> = Vec::new();

    if let Some((hostname, tags)) = &device {
        output.push("┌─ 📡 DEVICE OVERVIEW".to_string());
        output.push(format!("│  Device Name: {}", hostname));
        if let Some(model) = &chassis_model {
            output.push(format!("│  Model: {}", model));
        }
        if !tags.is_empty() {
            output.push(format!("│  Tags: {}", tags.join(", ")));
        }
        output.push("└─".to_string());
    }

    if let Some([ip, fqdn, customer]) = &network {
        output.push("\n┌─ 🌐 NETWORK INFORMATION".to_string());
        output.push(format!("│  IP Address: {}", ip));
        output.push(format!("│  FQDN: {}", fqdn));
        output.push(format!("│  Customer: {}", customer));
        output.push("└─".to_string());
    }

    if !interfaces.is_empty() {
        output.push(format!("\n┌─ 🔌 INTERFACES ({} found)", interfaces.len()));
        for name in interfaces.iter().take(6) {
            output.push(format!("│  • {}", name));
        }
        if interfaces.len() > 6 {
            output.push(format!("│  ... and {} more", interfaces.len() - 6));
        }
        output.push("└─".to_string());
    }

    if !connections.is_empty() {
        output.push("\n┌─ 🔗 NETWORK CONNECTIONS".to_string());
        for [sap, router, service, vlan] in &connections {
            output.push(format!("│  Upstream Router: {}", router));
            output.push(format!("│  Service: {}", service));
            output.push(format!("│  SAP: {} (VLAN {})", sap, vlan));
        }
        output.push("└─".to_string());
    }

    if let Some(meta) = response.get("meta").filter(|m| !is_empty(m)) {
        output.push(format!(
            "\n📊 Query completed in {} - {} objects found",
            meta.get("query_duration").map(text).unwrap_or_else(|| "N/A".to_string()),
            meta.get("object_count").map(text).unwrap_or_else(|| "N/A".to_string())
        ));
    }

    output.join("\n")
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(o) => o.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

/// composite 報告（report_type = comware_ce / timos_core）
pub fn format_device_report(data: &Value) -> String {
    let mut output: Vec<String> = Vec::new();

    match data.get("report_type").and_then(Value::as_str) {
        Some("comware_ce") => {
            output.push("📋 COMWARE CE DEVICE DETAILED REPORT".to_string());
            output.push(REPORT_RULE.to_string());
            if let Some(detail) = data.get("comware_detail").filter(|d| !is_empty(d)) {
                format_comware_detail(detail, &mut output);
            }
        }
        Some("timos_core") => {
            output.push("📋 TIMOS CORE DEVICE DETAILED REPORT".to_string());
            output.push(REPORT_RULE.to_string());

            if let Some(device_info) = data.get("device_info") {
                format_timos_device(device_info, &mut output);
            }
            if let Some(saps) = data.get("saps") {
                format_listing(
                    "\n🔗 SERVICE ACCESS POINTS (SAPs):",
                    "SAPs",
                    saps,
                    true,
                    &mut output,
                );
            }
            if let Some(routes) = data.get("routes") {
                format_listing("\n🛤️ ROUTING INFORMATION:", "Routes", routes, false, &mut output);
            }
            if let Some(interfaces) = data.get("interfaces") {
                format_listing(
                    "\n🔌 NETWORK INTERFACES:",
                    "Interfaces",
                    interfaces,
                    false,
                    &mut output,
                );
            }
            if let Some(subscribers) = data.get("subscribers") {
                format_listing(
                    "\n👥 SUBSCRIBER INFORMATION:",
                    "Subscribers",
                    subscribers,
                    false,
                    &mut output,
                );
            }
        }
        _ => {}
    }

    output.join("\n")
}

fn format_comware_detail(detail: &Value, output: &mut Vec<String>) {
    for (key, label) in [("hostname", "Device"), ("model", "Model"), ("vendor", "Vendor")] {
        if let Some(value) = detail.get(key) {
            let prefix = if key == "hostname" { "\n" } else { "" };
            output.push(format!("{}🔹 {}: {}", prefix, label, text(value)));
        }
    }

    if let Some(interfaces) = detail.get("interfaces") {
        output.push("\n📡 INTERFACES:".to_string());
        output.push(SECTION_RULE.to_string());
        match interfaces {
            Value::Array(list) => {
                for intf in list.iter().take(10) {
                    if intf.is_object() {
                        output.push(format!(
                            "  • {}: {} (IP: {})",
                            intf.get("name").map(text).unwrap_or_else(|| "Unknown".to_string()),
                            intf.get("status").map(text).unwrap_or_else(|| "Unknown".to_string()),
                            intf.get("ip_address").map(text).unwrap_or_else(|| "N/A".to_string())
                        ));
                    } else {
                        output.push(format!("  • {}", text(intf)));
                    }
                }
                if list.len() > 10 {
                    output.push(format!("  ... and {} more interfaces", list.len() - 10));
                }
            }
            other => output.push(format!("  {}", text(other))),
        }
    }

    if let Some(Value::Object(vrfs)) = detail.get("vrfs") {
        output.push("\n🌐 VRF CONFIGURATION:".to_string());
        output.push(SECTION_RULE.to_string());
        for (name, vrf) in vrfs.iter().take(5) {
            output.push(format!("  VRF: {}", name));
            if let Some(Value::Array(vrf_interfaces)) = vrf.get("interfaces") {
                let names: Vec<String> = vrf_interfaces.iter().take(3).map(text).collect();
                output.push(format!("    Interfaces: {}", names.join(", ")));
            }
            if let Some(routes) = vrf.get("routes") {
                let count = routes.as_array().map_or(0, Vec::len);
                output.push(format!("    Routes: {} configured", count));
            }
        }
    }

    if let Some(last) = detail.get("last_discovered") {
        output.push("\n🕒 LAST DISCOVERED:".to_string());
        output.push(SECTION_RULE.to_string());
        push_key_values(last, output);
    }

    if let Some(cpe) = detail.get("cpe_details") {
        output.push("\n🔧 CPE DETAILS:".to_string());
        output.push(SECTION_RULE.to_string());
        push_key_values(cpe, output);
    }

    if let Value::Object(fields) = detail {
        for (key, value) in fields {
            if COMWARE_KNOWN_KEYS.contains(&key.as_str()) {
                continue;
            }
            output.push(format!("\n📌 {}:", key.to_uppercase().replace('_', " ")));
            output.push(SECTION_RULE.to_string());
            if value.is_object() || value.is_array() {
                let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| text(value));
                output.push(format!("  {}", truncate_chars(&pretty, 300)));
            } else {
                output.push(format!("  {}", text(value)));
            }
        }
    }
}

fn push_key_values(value: &Value, output: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                output.push(format!("  {}: {}", key, text(value)));
            }
        }
        other => output.push(format!("  {}", text(other))),
    }
}

fn format_timos_device(device_info: &Value, output: &mut Vec<String>) {
    output.push("\n📡 DEVICE INFORMATION:".to_string());
    output.push(SECTION_RULE.to_string());

    let first_device = match device_info.get("data") {
        Some(Value::Array(list)) => list.first(),
        Some(other) => Some(other),
        None => None,
    };

    match (device_info, first_device) {
        (_, Some(device)) => {
            for (key, label) in [
                ("hostname", "Hostname"),
                ("platform", "Platform"),
                ("room", "Room"),
                ("rack_location", "Rack Location"),
            ] {
                output.push(format!(
                    "  {}: {}",
                    label,
                    device.get(key).map(text).unwrap_or_else(|| "N/A".to_string())
                ));
            }
            let tags: Vec<String> = device
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| tags.iter().map(text).collect())
                .unwrap_or_default();
            output.push(format!("  Tags: {}", tags.join(", ")));
        }
        (Value::Object(map), None) => {
            for (key, value) in map {
                output.push(format!("  {}: {}", key, text(value)));
            }
        }
        (other, None) => output.push(format!("  Raw data: {}", text(other))),
    }
}

/// 列出一個 NORM view 區段的前五筆；錯誤區段顯示錯誤訊息
fn format_listing(
    heading: &str,
    label: &str,
    section: &Value,
    numbered: bool,
    output: &mut Vec<String>,
) {
    output.push(heading.to_string());
    output.push(SECTION_RULE.to_string());

    let entries = match section {
        Value::Object(map) => match (map.get("data"), map.get("error")) {
            (Some(Value::Array(list)), _) => Some(list.as_slice()),
            (_, Some(error)) => {
                output.push(format!("  {} Error: {}", label, text(error)));
                return;
            }
            _ => None,
        },
        Value::Array(list) => Some(list.as_slice()),
        _ => None,
    };

    match entries {
        Some([]) => output.push(format!("  No {} found", label)),
        Some(list) => {
            output.push(format!("  Total {}: {}", label, list.len()));
            for (i, entry) in list.iter().take(5).enumerate() {
                if numbered {
                    output.push(format!("  {}. {}", i + 1, text(entry)));
                } else {
                    output.push(format!("    • {}", text(entry)));
                }
            }
        }
        None => output.push(format!("  {} data: {}", label, text(section))),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
