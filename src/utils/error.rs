use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Language model error: {message}")]
    ModelError { message: String },

    #[error("AccessDenied: {message}")]
    ModelAccessDenied { message: String },

    #[error("AWS credentials error: {message}")]
    CredentialsError { message: String },

    #[error("{message}")]
    DeviceApiError { status: Option<u16>, message: String },

    #[error("Tool '{tool}' failed: {message}")]
    ToolError { tool: String, message: String },

    #[error("Unknown tool: {name}. Available tools: {available:?}")]
    UnknownTool {
        name: String,
        available: Vec<String>,
    },

    #[error("Invalid arguments for '{tool}': {message}")]
    InvalidToolArguments { tool: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Model,
    Authentication,
    Tool,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AgentError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AgentError::ApiError(_) | AgentError::DeviceApiError { .. } => ErrorCategory::Network,
            AgentError::TomlError(_)
            | AgentError::ConfigError { .. }
            | AgentError::ConfigValidationError { .. }
            | AgentError::InvalidConfigValueError { .. }
            | AgentError::MissingConfigError { .. } => ErrorCategory::Configuration,
            AgentError::ModelError { .. } => ErrorCategory::Model,
            AgentError::ModelAccessDenied { .. } | AgentError::CredentialsError { .. } => {
                ErrorCategory::Authentication
            }
            AgentError::ToolError { .. }
            | AgentError::UnknownTool { .. }
            | AgentError::InvalidToolArguments { .. } => ErrorCategory::Tool,
            AgentError::IoError(_) | AgentError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Tool => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Model => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Authentication => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 給使用者的修復建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AgentError::ModelAccessDenied { .. } => {
                "Check your AWS Bedrock model access in the console"
            }
            AgentError::CredentialsError { .. } => {
                "Run 'aws configure' to set up your credentials"
            }
            AgentError::ModelError { .. } => {
                "Verify the model id and region, then retry the query"
            }
            AgentError::ApiError(_) | AgentError::DeviceApiError { .. } => {
                "Check network connectivity to the NORM API and that the hostname is correct"
            }
            AgentError::TomlError(_)
            | AgentError::ConfigError { .. }
            | AgentError::ConfigValidationError { .. }
            | AgentError::InvalidConfigValueError { .. }
            | AgentError::MissingConfigError { .. } => {
                "Review the configuration file and environment variables"
            }
            AgentError::ToolError { .. }
            | AgentError::UnknownTool { .. }
            | AgentError::InvalidToolArguments { .. } => {
                "Rephrase the request with a concrete device hostname"
            }
            AgentError::IoError(_) | AgentError::SerializationError(_) => {
                "Retry the operation; if it persists, run with --verbose and inspect the logs"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Authentication => format!("AWS setup issue: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Could not reach a remote service: {}", self),
            ErrorCategory::Model => format!("The language model failed: {}", self),
            ErrorCategory::Tool => format!("Tool execution failed: {}", self),
            ErrorCategory::System => format!("Unexpected system error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_carry_aws_tips() {
        let denied = AgentError::ModelAccessDenied {
            message: "no access to model".to_string(),
        };
        assert_eq!(denied.category(), ErrorCategory::Authentication);
        assert!(denied.to_string().contains("AccessDenied"));
        assert!(denied.recovery_suggestion().contains("Bedrock model access"));

        let creds = AgentError::CredentialsError {
            message: "no providers in chain".to_string(),
        };
        assert!(creds.recovery_suggestion().contains("aws configure"));
        assert_eq!(creds.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_severity_ordering() {
        let tool = AgentError::UnknownTool {
            name: "reboot".to_string(),
            available: vec!["get_device_info".to_string()],
        };
        let io = AgentError::IoError(std::io::Error::other("disk"));
        assert!(tool.severity() < io.severity());
        assert_eq!(
            tool.to_string(),
            "Unknown tool: reboot. Available tools: [\"get_device_info\"]"
        );
    }
}
