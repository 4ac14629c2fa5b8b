use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use prodsearch::{PipelineConfig, SearchOrchestrator};
use tracing_subscriber::EnvFilter;

/// One-shot product search; prints the result as JSON.
#[derive(Debug, Parser)]
#[command(name = "prodsearch")]
#[command(about = "Hybrid lexical/vector product search")]
#[command(version)]
struct Args {
    /// Pipeline YAML (defaults plus environment overrides when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Page size; clamped to the configured maximum
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Free-text query, e.g. `running shoes from Nike`
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
}

impl Args {
    fn query_text(&self) -> String {
        self.query.join(" ")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let query = args.query_text();
    if query.trim().is_empty() {
        anyhow::bail!("query must not be blank");
    }
    let config = PipelineConfig::load(args.config.as_deref()).context("loading pipeline config")?;
    let limit = args
        .limit
        .unwrap_or(config.search.default_limit)
        .clamp(1, config.search.max_limit);

    let orchestrator = SearchOrchestrator::from_config(&config).context("building search pipeline")?;
    let result = orchestrator.search(&query, limit, args.offset, None).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
