use crate::config::NormApiConfig;
use crate::domain::model::DeviceKind;
use crate::utils::error::{AgentError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

const SUPER_SEARCH_PATH: [&str; 4] = ["norm_services", "v1", "search", "super_search"];
const DEVICE_MANAGER_PATH: [&str; 3] = ["devicemanager", "v1", "device"];

/// TIMOS composite 報告的子端點（順序即輸出順序）
pub const TIMOS_COMPOSITE_SECTIONS: [&str; 4] = ["saps", "routes", "subscribers", "interfaces"];

/// NORM REST API 客戶端
#[derive(Debug, Clone)]
pub struct NormClient {
    client: Client,
    base_url: String,
    api_key: String,
    username: String,
    request_id: String,
    timeout: Duration,
}

impl NormClient {
    pub fn new(config: &NormApiConfig) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;

        // 未設定 request id 時，每個客戶端產生一個
        let request_id = config
            .request_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            username: config.username.clone(),
            request_id,
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// 建立共用標頭；devicemanager 端點改用 `key` 標頭傳遞 API key
    fn headers(&self, key_header: &'static str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static(key_header), header_value(&self.api_key)?);
        headers.insert(HeaderName::from_static("username"), header_value(&self.username)?);
        headers.insert(
            HeaderName::from_static("x-request-id"),
            header_value(&self.request_id)?,
        );
        Ok(headers)
    }

    /// 逐段組出 URL；主機名稱中的 `/`、`?`、`#` 會被百分比編碼
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| AgentError::ConfigError {
            message: format!("Invalid NORM API base URL '{}': {}", self.base_url, e),
        })?;
        url.path_segments_mut()
            .map_err(|_| AgentError::ConfigError {
                message: format!("NORM API base URL '{}' cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, segments: &[&str], key_header: &'static str) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        tracing::debug!("📡 GET {}", url);
        Ok(self
            .client
            .get(url)
            .headers(self.headers(key_header)?)
            .timeout(self.timeout))
    }

    async fn fetch_json(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("📡 NORM API response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        Ok(response.json().await?)
    }

    /// super_search：依主機名稱搜尋所有相關物件
    pub async fn super_search(&self, hostname: &str) -> Result<Value> {
        let request = self
            .get(&SUPER_SEARCH_PATH, "x-api-key")?
            .query(&[("search_term", hostname)]);
        let data = self.fetch_json(request).await?;

        let count = data
            .pointer("/meta/object_count")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        tracing::debug!("Received response with {} objects", count);
        Ok(data)
    }

    /// 依裝置類型取得 /detail 報告
    pub async fn view_detail(&self, kind: DeviceKind, hostname: &str) -> Result<Value> {
        let path = [
            "norm_services",
            "v1",
            "view",
            kind.path_segment(),
            hostname,
            "detail",
        ];
        let request = self.get(&path, "x-api-key")?;
        self.fetch_json(request).await
    }

    /// 分別抓取 TIMOS 各區段；單一區段失敗只記錄錯誤，不影響整份報告
    pub async fn timos_composite(&self, hostname: &str) -> Result<Value> {
        let mut results = Map::new();

        for section in TIMOS_COMPOSITE_SECTIONS {
            let path = ["norm_services", "v1", "view", "timos", hostname, section];
            let outcome = match self.get(&path, "x-api-key") {
                Ok(request) => self.fetch_json(request).await,
                Err(e) => Err(e),
            };
            results.insert(section.to_string(), section_value(section, outcome));
        }

        let outcome = match self.get(&DEVICE_MANAGER_PATH, "key") {
            Ok(request) => {
                let pattern = format!("^{}$", hostname);
                self.fetch_json(request.query(&[("hostname", pattern.as_str())]))
                    .await
            }
            Err(e) => Err(e),
        };
        results.insert("device_info".to_string(), section_value("device_info", outcome));

        results.insert("report_type".to_string(), json!("timos_core"));
        Ok(Value::Object(results))
    }
}

fn section_value(section: &str, outcome: Result<Value>) -> Value {
    match outcome {
        Ok(value) => value,
        Err(AgentError::DeviceApiError {
            status: Some(code), ..
        }) => {
            tracing::warn!("Failed to fetch {}: {}", section, code);
            json!({ "error": format!("HTTP {}", code) })
        }
        Err(e) => {
            tracing::error!("Error fetching {}: {}", section, e);
            json!({ "error": e.to_string() })
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| AgentError::ConfigError {
        message: format!("Invalid header value: {}", e),
    })
}

fn status_error(status: StatusCode, body: &str) -> AgentError {
    let reason = status.canonical_reason().unwrap_or("Unknown status");
    let message = if body.trim().is_empty() {
        format!("HTTP {} {}", status.as_u16(), reason)
    } else {
        format!("HTTP {} {}: {}", status.as_u16(), reason, truncate(body.trim(), 200))
    };
    AgentError::DeviceApiError {
        status: Some(status.as_u16()),
        message,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
