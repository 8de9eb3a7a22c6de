//! Museflow CLI entry point

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::info;

use museflow::agent::{RunInput, WorkflowEngine, parse_plan};
use museflow::cli::{Cli, Command};
use museflow::config::Config;
use museflow::domain::new_thread_id;
use museflow::llm::{GenerateRequest, Message, create_client};
use museflow::prompts::PromptLoader;
use museflow::state::StateManager;
use museflow::tools::ToolExecutor;

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("museflow")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to a log file, keep stdout for results
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("museflow.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    info!(
        "Museflow loaded config: provider={}, model={}",
        config.llm.provider, config.llm.model
    );

    match cli.command {
        Command::Run {
            request,
            thread,
            output,
        } => cmd_run(&config, &request, thread, output).await,
        Command::Plan { request } => cmd_plan(&config, &request).await,
        Command::Status { thread } => cmd_status(&config, &thread).await,
    }
}

/// Build the workflow engine from config
fn build_engine(config: &Config) -> Result<WorkflowEngine> {
    let llm = create_client(&config.llm)?;
    let tools = Arc::new(ToolExecutor::standard(&config.search));
    let state = StateManager::spawn(config.storage.resolve_data_dir())?;
    let prompts = PromptLoader::new(config.agent.prompts_dir.clone());

    Ok(WorkflowEngine::new(
        llm,
        tools,
        state,
        prompts,
        &config.agent,
        config.llm.max_tokens,
    ))
}

/// Run the research agent end to end
async fn cmd_run(config: &Config, request: &str, thread: Option<String>, output: Option<PathBuf>) -> Result<()> {
    let engine = build_engine(config)?;
    let thread_id = thread.unwrap_or_else(new_thread_id);

    println!("{} {}", "thread:".dimmed(), thread_id);

    let state = engine
        .run_with_snapshot(RunInput::from_request(request), &thread_id, output.as_deref())
        .await?;

    println!("\n{}", "Plan".bold());
    print!("{}", state.format_plan_status());

    if let Some(summary) = &state.final_summary {
        println!("\n{}", "Answer".bold());
        println!("{}", summary.text_summary);

        if !summary.references.is_empty() {
            println!("\n{}", "References".bold());
            for (i, reference) in summary.references.iter().enumerate() {
                println!(
                    "{}. {} {}",
                    i + 1,
                    reference.title.green(),
                    format!("({})", reference.r#type).dimmed()
                );
                println!("   {}", reference.url.blue());
                if !reference.description.is_empty() {
                    println!("   {}", reference.description);
                }
            }
        }
    }

    Ok(())
}

/// Create and print a plan without executing it
async fn cmd_plan(config: &Config, request: &str) -> Result<()> {
    let llm = create_client(&config.llm)?;
    let prompts = PromptLoader::new(config.agent.prompts_dir.clone());

    let instruction = prompts.render("plan-generation", &serde_json::json!({}))?;
    let generate = GenerateRequest {
        system_instruction: Some(instruction),
        messages: vec![Message::user(request)],
        tools: vec![],
        max_tokens: config.llm.max_tokens,
        json_output: false,
    };

    let response = llm.generate(generate).await?;
    let steps = parse_plan(&response.content.unwrap_or_default(), request);

    println!("{}", "Plan".bold());
    for (i, step) in steps.iter().enumerate() {
        println!("{}. {}", i, step.task);
        if !step.action.is_empty() {
            for line in step.action.lines() {
                println!("   - {}", line);
            }
        }
    }

    Ok(())
}

/// Show the checkpointed status board of a run
async fn cmd_status(config: &Config, thread_id: &str) -> Result<()> {
    let engine = build_engine(config)?;

    match engine.load_state(thread_id).await? {
        Some(state) => {
            println!("{} {}", "node:".dimmed(), state.node);
            println!("\n{}", "Plan".bold());
            print!("{}", state.format_plan_status());
            if let Some(summary) = &state.final_summary {
                println!("\n{}", "Answer".bold());
                println!("{}", summary.text_summary);
            }
        }
        None => {
            println!("No run found for thread {}", thread_id);
        }
    }

    Ok(())
}
