use anyhow::Context;
use clap::Parser;
use norm_agent::config::AgentConfig;
use norm_agent::core::formatter;
use norm_agent::domain::ports::Tool;
use norm_agent::tools::{device_info, GetDeviceReport};
use norm_agent::utils::logger;
use norm_agent::NormClient;
use serde_json::json;
use std::path::PathBuf;

/// 直接呼叫 NORM API 檢查單一裝置（不經過模型）
#[derive(Debug, Parser)]
#[command(name = "norm-probe")]
#[command(about = "Query the NORM API for a device without the language model")]
struct ProbeArgs {
    /// Device hostname, e.g. SRMECH01
    hostname: String,

    /// Also fetch the detailed report using these comma-separated tags (e.g. TIMOS,CORE)
    #[arg(short, long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Print the super_search overview instead of the agent interpretation
    #[arg(long)]
    overview: bool,

    /// Print the raw JSON responses
    #[arg(long)]
    raw: bool,

    /// Path to the TOML configuration file
    #[arg(short, long, env = "NORM_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ProbeArgs::parse();
    logger::init_cli_logger(args.verbose);

    let config = AgentConfig::load(args.config.as_deref()).context("loading configuration")?;
    config
        .validate_norm_api()
        .context("validating [norm_api] settings")?;

    let client = NormClient::new(&config.norm_api)?;
    println!("🚀 Probing {} via {}", args.hostname, client.base_url());

    let search = client
        .super_search(&args.hostname)
        .await
        .with_context(|| format!("super_search for {}", args.hostname))?;

    if args.raw {
        println!("{}", serde_json::to_string_pretty(&search)?);
    } else if args.overview {
        println!("{}", formatter::format_super_search(&search));
    } else {
        println!("{}", device_info::interpret(&args.hostname, &search));
        let tags = device_info::device_tags(&args.hostname, &search);
        if !tags.is_empty() {
            println!("\n🏷️  Tags: {}", tags.join(", "));
        }
    }

    if args.tags.is_empty() {
        return Ok(());
    }

    println!("\n📋 Fetching detailed report...");
    let report = GetDeviceReport::new(client, config.norm_api.report_mode)
        .execute(&json!({ "hostname": args.hostname, "tags": args.tags }))
        .await
        .with_context(|| format!("device report for {}", args.hostname))?;

    if args.raw {
        println!("{}", serde_json::to_string_pretty(&report.data)?);
    } else {
        println!("{}", report.interpretation);
    }

    Ok(())
}
