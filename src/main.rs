use clap::Parser;
use norm_agent::utils::console;
use norm_agent::utils::error::{AgentError, ErrorSeverity};
use norm_agent::utils::logger;
use norm_agent::utils::monitor::SessionMonitor;
use norm_agent::{
    build_language_model, AgentConfig, Cli, Command, NormClient, ReActAgent, ToolRegistry,
};
use std::io::Write;

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "q"];

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AgentConfig::load(cli.config.as_deref()) {
        Ok(mut config) => {
            cli.apply_overrides(&mut config);
            logger::init_logger(cli.resolved_log_format(&config), cli.verbose);
            config
        }
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            exit_with(&e);
        }
    };

    tracing::info!("Starting norm-agent");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    let outcome = match cli.command() {
        Command::Healthcheck => healthcheck(&config).await,
        Command::Tools => print_tools(&config),
        Command::Ask { query } => ask(&config, &query.join(" ")).await,
        Command::Chat => chat(&config).await,
    };

    if let Err(e) = outcome {
        exit_with(&e);
    }
}

/// 記錄錯誤並依嚴重程度決定退出碼
fn exit_with(e: &AgentError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Tip: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

/// 容器 HEALTHCHECK：能建立模型客戶端即視為健康
async fn healthcheck(config: &AgentConfig) -> norm_agent::Result<()> {
    config.validate_llm()?;
    let model = build_language_model(&config.llm).await?;
    tracing::debug!("Health check built {}", model.describe());
    println!("Health check passed");
    Ok(())
}

fn print_tools(config: &AgentConfig) -> norm_agent::Result<()> {
    let client = NormClient::new(&config.norm_api)?;
    let registry = ToolRegistry::with_defaults(client, config.norm_api.report_mode);
    println!("{}", registry.definitions_json());
    Ok(())
}

async fn build_agent(config: &AgentConfig) -> norm_agent::Result<ReActAgent> {
    config.validate_config()?;

    let model = build_language_model(&config.llm).await?;
    let client = NormClient::new(&config.norm_api)?;
    tracing::info!(
        "🔗 NORM API at {} (request id {})",
        client.base_url(),
        client.request_id()
    );
    let tools = ToolRegistry::with_defaults(client, config.norm_api.report_mode);

    Ok(ReActAgent::new(
        model,
        tools,
        config.agent.clone(),
        config.llm.max_chat_history_length,
    ))
}

async fn ask(config: &AgentConfig, query: &str) -> norm_agent::Result<()> {
    let mut agent = build_agent(config).await?;
    let mut monitor = SessionMonitor::new(config.monitoring.enabled);

    monitor.start_query();
    let response = agent.process_query(query).await;
    monitor.finish_query(agent.last_tool_calls());

    println!("{}", response?);
    Ok(())
}

async fn chat(config: &AgentConfig) -> norm_agent::Result<()> {
    println!("🚀 Starting NORM Agent - ReAct assistant for network devices");

    let mut agent = match build_agent(config).await {
        Ok(agent) => agent,
        Err(e) => {
            println!("\n❌ Please fix the configuration before continuing.");
            return Err(e);
        }
    };
    tracing::info!("ReAct agent initialized with {}", agent.model_description());
    println!("✅ Agent ready!");

    let mut monitor = SessionMonitor::new(config.monitoring.enabled);
    if monitor.is_enabled() {
        tracing::info!("🔍 Session monitoring enabled");
    }

    let mut lines = console::stdin_lines();
    // 同一個 Ctrl-C future 同時涵蓋等待輸入與處理查詢
    let mut interrupt = std::pin::pin!(tokio::signal::ctrl_c());

    loop {
        print!("\n🔍 Your query: ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.recv() => line,
            _ = &mut interrupt => interrupted(&monitor),
        };

        // EOF
        let Some(line) = line else {
            println!("\n👋 Goodbye!");
            break;
        };
        let line = line?;

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&query.to_lowercase().as_str()) {
            println!("\n👋 Goodbye!");
            break;
        }

        println!("\n⚙️  Processing your request...");
        monitor.start_query();
        let result = tokio::select! {
            result = agent.process_query(query) => result,
            _ = &mut interrupt => interrupted(&monitor),
        };
        monitor.finish_query(agent.last_tool_calls());

        match result {
            Ok(response) => {
                println!("\n💬 Response:");
                println!("{}", response);
            }
            Err(e) => {
                tracing::error!("Error processing query: {}", e);
                println!("\n❌ Error: {}", e);
                println!("💡 Tip: {}", e.recovery_suggestion());
                println!("Please try again or type 'exit' to quit.");
            }
        }
    }

    monitor.log_final_stats();
    Ok(())
}

/// Ctrl-C：道別後直接結束行程，不等待仍在阻塞的輸入讀取
fn interrupted(monitor: &SessionMonitor) -> ! {
    println!("\n\n👋 Goodbye!");
    monitor.log_final_stats();
    std::process::exit(0);
}
