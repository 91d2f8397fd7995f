use crate::config::toml_config::{AgentConfig, LlmProvider};
use crate::utils::logger::LogFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "norm-agent")]
#[command(about = "ReAct agent for NORM network device queries backed by AWS Bedrock")]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "NORM_AGENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format (text or json)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Log per-query latency and memory statistics
    #[arg(long)]
    pub monitor: bool,

    /// Override the language model provider (bedrock or openai)
    #[arg(long)]
    pub provider: Option<LlmProvider>,

    /// Override the AWS region used for Bedrock
    #[arg(long)]
    pub region: Option<String>,

    /// Override the Bedrock model id
    #[arg(long)]
    pub model_id: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start the interactive query loop (default)
    Chat,
    /// Answer a single query and exit
    Ask {
        /// The question to ask, e.g. "show me info about SRMECH01"
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Print the tool definitions advertised to the model
    Tools,
    /// Verify the model SDK client can be constructed (container health probe)
    Healthcheck,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }

    /// 命令列參數優先於檔案與環境變數
    pub fn apply_overrides(&self, config: &mut AgentConfig) {
        if let Some(provider) = self.provider {
            config.llm.provider = provider;
        }
        if let Some(region) = &self.region {
            config.llm.aws_region = region.clone();
        }
        if let Some(model_id) = &self.model_id {
            config.llm.model_id = model_id.clone();
        }
        if self.monitor {
            config.monitoring.enabled = true;
        }
    }

    pub fn resolved_log_format(&self, config: &AgentConfig) -> LogFormat {
        self.log_format
            .or_else(|| config.log_format().and_then(|f| f.parse().ok()))
            .unwrap_or_default()
    }
}
