use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use vetloop::action::ActionExecutor;
use vetloop::config::GlobalConfig;
use vetloop::domain::Task;
use vetloop::llm::{AnthropicClient, AnthropicConfig, LlmClient};
use vetloop::runner::RetryCoordinator;
use vetloop::validation::CorrectnessChecker;

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vetloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("vetloop.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn anthropic_client(config: &GlobalConfig) -> Result<Arc<dyn LlmClient>> {
    let anthropic = AnthropicConfig {
        model: config.llm.model.clone(),
        base_url: config.llm.base_url.clone(),
        max_tokens: config.llm.max_tokens,
        timeout: Duration::from_millis(config.llm.timeout_ms),
    };
    let client = AnthropicClient::from_env(&config.llm.api_key_env, anthropic)
        .context("Failed to create Anthropic client")?;
    Ok(Arc::new(client))
}

async fn run_application(cli: &Cli, config: &GlobalConfig) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run {
            goal,
            max_rounds,
            information,
            tools,
        } => handle_run_command(goal, *max_rounds, information.as_deref(), tools.as_deref(), config).await,
        Commands::Check { goal, content } => handle_check_command(goal, content, config).await,
        Commands::Execute { file } => handle_execute_command(file.as_deref(), config),
        Commands::Config => handle_config_command(config),
    }
}

async fn handle_run_command(
    goal: &str,
    max_rounds: Option<u32>,
    information: Option<&str>,
    tools: Option<&str>,
    config: &GlobalConfig,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(max_rounds) = max_rounds {
        config.retry.max_rounds = max_rounds;
    }

    let client = anthropic_client(&config)?;
    let coordinator = RetryCoordinator::from_config(&config, client.clone(), client)?;

    let mut task = Task::new(goal);
    if let Some(information) = information {
        task = task.with_information(information);
    }
    if let Some(tools) = tools {
        task = task.with_tools(tools);
    }

    info!("Agent {}: {}", config.agent.role, config.agent.description());
    info!("Running turn {} for goal: {}", task.id(), goal);
    println!("{} {}", "Running:".cyan(), goal);

    let cancelled = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let report = coordinator.run_until(&task, cancelled).await?;

    let label = if report.is_accepted() {
        format!("Accepted after {} round(s):", report.result.rounds_used)
            .as_str()
            .green()
    } else if report.ended_with_error() {
        "Failed:".red()
    } else {
        "Rejected:".yellow()
    };
    println!("{}\n{}", label, report);

    Ok(())
}

async fn handle_check_command(goal: &str, content: &str, config: &GlobalConfig) -> Result<()> {
    config.validate()?;

    let client = anthropic_client(config)?;
    let checker = CorrectnessChecker::from_config(&config.judge, client);

    let verdict = checker.check(goal, content).await.context("Correctness check failed")?;

    if verdict.accepted {
        println!("{}", "Accepted".green());
    } else {
        println!("{}", "Rejected".red());
        if let Some(reason) = verdict.fail_reason {
            println!("  {}", reason);
        }
    }

    Ok(())
}

fn handle_execute_command(file: Option<&Path>, config: &GlobalConfig) -> Result<()> {
    let raw = match file {
        Some(path) => fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read stdin")?;
            raw
        }
    };

    let outcome = ActionExecutor::new(config.retry.sentinel.clone()).execute(&raw);

    if outcome.success {
        println!("{}", "Accepted".green());
    } else {
        println!("{}", "Rejected".red());
    }
    println!("{}", outcome.content);

    Ok(())
}

fn handle_config_command(config: &GlobalConfig) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    print!("{}", yaml);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = GlobalConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
