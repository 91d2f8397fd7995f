use crate::utils::error::{AgentError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_AWS_REGION: &str = "eu-central-1";
pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-5-sonnet-20240620-v1:0";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub llm: LlmConfig,
    pub norm_api: NormApiConfig,
    pub agent: AgentSettings,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Bedrock,
    #[serde(alias = "openai-compatible")]
    OpenAi,
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bedrock" => Ok(LlmProvider::Bedrock),
            "openai" | "openai-compatible" => Ok(LlmProvider::OpenAi),
            other => Err(format!("unknown provider '{}', use bedrock or openai", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub aws_region: String,
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub max_chat_history_length: usize,
    pub openai: Option<OpenAiConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Bedrock,
            aws_region: DEFAULT_AWS_REGION.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            temperature: 0.2,
            max_tokens: 4096,
            timeout_seconds: 30,
            max_chat_history_length: 20,
            openai: None,
        }
    }
}

/// OpenAI 相容端點（本地 LLM 伺服器等）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// 單一 /detail 端點
    #[default]
    Detail,
    /// saps / routes / device_info / subscribers / interfaces 五個端點
    Composite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub username: String,
    pub request_id: Option<String>,
    pub timeout_seconds: u64,
    pub verify_tls: bool,
    pub report_mode: ReportMode,
}

impl Default for NormApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            username: "norm-agent".to_string(),
            request_id: None,
            timeout_seconds: 30,
            verify_tls: true,
            report_mode: ReportMode::Detail,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub max_iterations: usize,
    pub confirmation_words: Vec<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            confirmation_words: ["yes", "y", "sure", "ok", "okay", "yep", "yeah"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: Option<String>,
}

impl AgentConfig {
    /// 載入配置：有路徑就讀檔，否則使用預設值；最後套用環境變數覆寫
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| AgentError::ConfigError {
            message: format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AgentError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${NORM_API_KEY})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AgentError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// 以查詢函式套用覆寫，方便測試時不必改動行程環境
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(region) = lookup("AWS_REGION") {
            self.llm.aws_region = region;
        }
        if let Some(model_id) = lookup("BEDROCK_MODEL_ID") {
            self.llm.model_id = model_id;
        }
        if let Some(temperature) = lookup("LLM_TEMPERATURE") {
            self.llm.temperature = parse_override("LLM_TEMPERATURE", &temperature)?;
        }
        if let Some(max_tokens) = lookup("LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_override("LLM_MAX_TOKENS", &max_tokens)?;
        }
        if let Some(base_url) = lookup("NORM_API_URL") {
            self.norm_api.base_url = base_url;
        }
        if let Some(api_key) = lookup("NORM_API_KEY") {
            self.norm_api.api_key = api_key;
        }
        if let Some(username) = lookup("NORM_USERNAME") {
            self.norm_api.username = username;
        }
        if let Some(request_id) = lookup("NORM_REQUEST_ID") {
            self.norm_api.request_id = Some(request_id);
        }
        Ok(())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        self.validate_llm()?;
        self.validate_norm_api()?;
        validation::validate_positive_number("agent.max_iterations", self.agent.max_iterations, 1)?;
        Ok(())
    }

    /// 只驗證模型設定（healthcheck 不需要 NORM）
    pub fn validate_llm(&self) -> Result<()> {
        validation::validate_aws_region("llm.aws_region", &self.llm.aws_region)?;
        validation::validate_non_empty_string("llm.model_id", &self.llm.model_id)?;
        validation::validate_range("llm.temperature", self.llm.temperature, 0.0, 1.0)?;
        validation::validate_positive_number("llm.max_tokens", self.llm.max_tokens as usize, 1)?;
        validation::validate_positive_number(
            "llm.max_chat_history_length",
            self.llm.max_chat_history_length,
            1,
        )?;

        if self.llm.provider == LlmProvider::OpenAi {
            let openai = validation::validate_required_field("llm.openai", &self.llm.openai)?;
            validation::validate_url("llm.openai.base_url", &openai.base_url)?;
            validation::validate_non_empty_string("llm.openai.model", &openai.model)?;
        }
        Ok(())
    }

    pub fn validate_norm_api(&self) -> Result<()> {
        validation::validate_url("norm_api.base_url", &self.norm_api.base_url)?;
        validation::validate_non_empty_string("norm_api.api_key", &self.norm_api.api_key)?;
        validation::validate_non_empty_string("norm_api.username", &self.norm_api.username)?;
        validation::validate_positive_number(
            "norm_api.timeout_seconds",
            self.norm_api.timeout_seconds as usize,
            1,
        )?;
        Ok(())
    }

    pub fn log_format(&self) -> Option<&str> {
        self.monitoring.log_format.as_deref()
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| AgentError::InvalidConfigValueError {
            field: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

impl Validate for AgentConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
