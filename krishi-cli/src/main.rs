//! krishi CLI - agricultural assistant with bounded tool-using reasoning.

mod cli;
mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures_util::StreamExt;
use krishi_calculator::Calculator;
use krishi_core::{
    AgentContext, AnswerEmitter, Completion, CompletionStatus, LlmClient, Query, QueryRouter,
    StreamItem, ToolBinding, ToolRegistry, Turn,
};
use krishi_location::Location;
use krishi_openai::OpenAiCompatible;
use krishi_weather::Weather;
use std::io::Write;
use std::path::Path;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    // Validate arguments
    if let Err(e) = args.validate() {
        bail!("{}", e);
    }

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let (file_config, source) =
        config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = source {
        log::debug!("Using config file {}", path.display());
    }
    let settings = args.settings(&file_config);

    let history = match &args.history {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };

    let completion = run(&args, settings, history).await?;
    match completion.status {
        CompletionStatus::Complete => Ok(()),
        CompletionStatus::Incomplete => {
            eprintln!("\n{}", completion.message.as_deref().unwrap_or("Interrupted."));
            std::process::exit(130); // Standard exit code for SIGINT
        }
        CompletionStatus::Failed => {
            bail!(
                "{}",
                completion
                    .message
                    .unwrap_or_else(|| krishi_core::GENERIC_FAILURE_MESSAGE.to_string())
            )
        }
    }
}

async fn run(args: &cli::Args, settings: cli::Settings, history: Vec<Turn>) -> Result<Completion> {
    let model = match &args.api_key {
        Some(key) => OpenAiCompatible::new(key.clone(), args.model.clone()),
        None => OpenAiCompatible::new("", args.model.clone()).without_api_key(),
    };
    let model = match &args.base_url {
        Some(url) => model.with_base_url(url.clone()),
        None => model,
    };
    log::info!("Using model '{}' at {}", args.model, model.base_url());
    let llm = LlmClient::new(model, settings.llm);

    let mut tools = ToolRegistry::new().with_timeout(settings.tool_timeout);
    tools
        .register(ToolBinding::text(Calculator))
        .register(ToolBinding::no_arg(Location))
        .register(ToolBinding::keyword(Weather));

    let cancellation_token = CancellationToken::new();
    let context = AgentContext::new(llm, tools).with_cancellation(cancellation_token.clone());

    let router = QueryRouter::new(settings.router, settings.engine).context("Invalid configuration")?;
    let emitter = AnswerEmitter::new(router, settings.emitter);

    // First Ctrl+C cancels the run and flushes what was delivered; a second one exits.
    tokio::spawn(async move {
        let mut interrupts = 0u8;
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Failed to listen for Ctrl+C: {}", e);
                return;
            }
            interrupts = interrupts.saturating_add(1);
            if interrupts == 1 {
                eprintln!("\nInterrupt received - stopping...");
                eprintln!("   (Press Ctrl+C again to exit immediately)");
                cancellation_token.cancel();
            } else {
                eprintln!("\nForce exit requested");
                std::process::exit(130);
            }
        }
    });

    let query = Query::new(args.query.clone()).with_history(history);
    let stream = emitter.stream(query, context);
    futures_util::pin_mut!(stream);

    let mut stdout = std::io::stdout();
    let mut completion = None;
    while let Some(item) = stream.next().await {
        match item {
            StreamItem::Chunk(text) => {
                print!("{}", text);
                stdout.flush().context("Failed to write to stdout")?;
            }
            StreamItem::Done(done) => completion = Some(done),
        }
    }
    println!();

    let completion = completion.context("Answer stream ended without a completion marker")?;
    if args.metadata {
        let json = serde_json::to_string(&completion.metadata).context("Failed to encode metadata")?;
        eprintln!("{}", json);
    } else {
        log::info!(
            "mode={:?} specialists={:?} iterations={} exhausted={} elapsed={}ms",
            completion.metadata.mode,
            completion.metadata.specialists,
            completion.metadata.iterations,
            completion.metadata.exhausted,
            completion.metadata.elapsed_ms
        );
    }
    Ok(completion)
}

/// Read prior turns from a JSON array of `{role, content}` objects.
fn load_history(path: &Path) -> Result<Vec<Turn>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse history file {}", path.display()))
}
