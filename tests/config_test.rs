use anyhow::Result;
use norm_agent::config::{AgentConfig, LlmProvider, ReportMode};
use norm_agent::utils::error::ErrorCategory;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_shipped_config_parses() -> Result<()> {
    let config = AgentConfig::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/configs/agent.toml"))?;

    assert_eq!(config.llm.provider, LlmProvider::Bedrock);
    assert_eq!(config.llm.aws_region, "eu-central-1");
    assert_eq!(config.norm_api.report_mode, ReportMode::Detail);
    assert_eq!(config.agent.max_iterations, 5);
    assert_eq!(config.agent.confirmation_words.len(), 7);
    config.validate_llm()?;
    Ok(())
}

#[test]
fn test_load_from_file_with_overrides() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
[llm]
provider = "openai"
temperature = 0.5

[llm.openai]
base_url = "http://localhost:1234/v1"
model = "local-model"

[norm_api]
base_url = "https://norm.example.net:9123"
api_key = "from-file"
report_mode = "composite"
"#
    )?;

    let mut config = AgentConfig::from_file(file.path())?;
    config.apply_overrides_from(|key| match key {
        "NORM_API_KEY" => Some("from-env".to_string()),
        "LLM_MAX_TOKENS" => Some("1024".to_string()),
        _ => None,
    })?;

    assert_eq!(config.llm.provider, LlmProvider::OpenAi);
    assert_eq!(config.llm.max_tokens, 1024);
    assert_eq!(config.norm_api.api_key, "from-env");
    assert_eq!(config.norm_api.report_mode, ReportMode::Composite);
    config.validate_config()?;
    Ok(())
}

#[test]
fn test_missing_norm_settings_fail_validation() {
    let config = AgentConfig::default();

    assert!(config.validate_llm().is_ok());
    let err = config.validate_config().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[test]
fn test_missing_file_is_config_error() {
    let err = AgentConfig::from_file("does/not/exist.toml").unwrap_err();
    assert!(err.to_string().contains("does/not/exist.toml"));
}
