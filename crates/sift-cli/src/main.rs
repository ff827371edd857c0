use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use sift_cli::{
    config::Config, fetch_json, is_valid_thread_url, logging::init_logging, save_output, thread_input,
    thread_json_url,
};
use sift_context::{Encoding, LlmProvider, Logged, RateLimited, SummaryLoop, TokenMeter};
use sift_llm::RateLimiter;
use sift_types::Progress;

/// Summarize a Reddit comment thread with an LLM
#[derive(Debug, Parser)]
#[command(name = "sift", version, about)]
struct Args {
    /// Thread permalink, e.g. https://www.reddit.com/r/rust/comments/abc123/title/
    url: String,

    /// Extra config file layered over config/default.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model preset name or id
    #[arg(long)]
    model: Option<String>,

    /// Maximum number of summary rounds
    #[arg(long)]
    rounds: Option<usize>,

    /// Directory the report is written to
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config.logging);

    if let Some(model) = &args.model {
        config
            .apply_preset(model)
            .map_err(|e| anyhow::anyhow!("Failed to select model: {}", e))?;
    }
    if let Some(rounds) = args.rounds {
        config.summary.max_number_of_summaries = rounds;
    }
    config.summary.validate()?;

    if !is_valid_thread_url(&args.url) {
        bail!("Not a valid thread URL: {}", args.url);
    }

    tracing::info!(
        model = %config.summary.selected_model,
        provider = %config.summary.model_type,
        "Starting sift"
    );

    let json_url = thread_json_url(&args.url);
    let document = fetch_json(&json_url, &config.fetch.user_agent, config.fetch.timeout()).await?;
    let input = thread_input(&document, &args.url)?;
    tracing::info!(title = %input.title, comments = input.fragments.len(), "Thread loaded");

    let provider_config = config
        .provider_config()
        .map_err(|e| anyhow::anyhow!("Failed to configure provider: {}", e))?;
    let llm = LlmProvider::from_config(provider_config)?;
    let limiter = Arc::new(RateLimiter::new(config.rate_limit.max_calls, config.rate_limit.window()));
    let provider = Logged::new(RateLimited::new(llm, limiter));

    let meter = TokenMeter::new(Encoding::for_provider(config.summary.model_type))?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing after the current round");
            on_ctrl_c.cancel();
        }
    });

    let summary = SummaryLoop::new(provider, meter, Arc::new(config.summary.clone()))
        .with_cancellation(cancel)
        .with_progress(Arc::new(|p: &Progress| {
            tracing::info!(round = p.round, percent = p.percent, "Summary round complete");
        }));

    let record = summary.run(&input).await?;

    let dir = args.output.unwrap_or_else(|| PathBuf::from(&config.output.dir));
    let path = save_output(&dir, &record.title, &record.report)
        .with_context(|| format!("Failed to write report to {}", dir.display()))?;

    if let Some(summary) = record.final_summary() {
        println!("{}", summary);
    }
    println!("\nReport saved to {}", path.display());

    Ok(())
}
