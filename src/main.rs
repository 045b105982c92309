use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scout_agent::{artifacts, ExplorationAgent, ExploreConfig, ScriptedDriver, ScriptedSite};

#[derive(Parser)]
#[command(name = "scout", version, about = "Autonomous web-app explorer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Explore a scripted site fixture and write the run artifacts.
    Explore(ExploreArgs),
    /// Summarize a previously written knowledge file.
    Inspect(InspectArgs),
}

#[derive(Args)]
struct ExploreArgs {
    /// JSON fixture describing the scripted site to explore.
    fixture: PathBuf,

    /// Entry URL; defaults to the fixture's start page.
    #[arg(long)]
    start_url: Option<String>,

    #[arg(long, default_value_t = 100)]
    max_steps: u32,

    #[arg(long, default_value_t = 10)]
    max_depth: usize,

    #[arg(long, default_value_t = 20)]
    no_path_limit: u32,

    /// Settle time after each action, in milliseconds.
    #[arg(long, default_value_t = 0)]
    settle_ms: u64,

    /// Directory the run artifacts are written into.
    #[arg(long, short, default_value = "scout-out")]
    output: PathBuf,
}

#[derive(Args)]
struct InspectArgs {
    /// Path to a knowledge.json produced by `scout explore`.
    knowledge: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Explore(args) => explore(args).await,
        Command::Inspect(args) => inspect(args),
    }
}

async fn explore(args: ExploreArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.fixture)
        .with_context(|| format!("reading fixture {}", args.fixture.display()))?;
    let site: ScriptedSite = serde_json::from_str(&raw)
        .with_context(|| format!("parsing fixture {}", args.fixture.display()))?;

    let start_url = match args.start_url {
        Some(url) => url,
        None => site
            .pages
            .get(&site.start)
            .map(|page| page.url.clone())
            .context("fixture start page not found")?,
    };

    let mut config = ExploreConfig::new(start_url);
    config.max_steps = args.max_steps;
    config.max_depth = args.max_depth;
    config.no_path_limit = args.no_path_limit;
    config.settle = Duration::from_millis(args.settle_ms);

    let driver = Box::new(ScriptedDriver::new(site));
    let agent = ExplorationAgent::new(config, driver);
    let report = agent.explore().await?;

    artifacts::write_run(&report, &args.output)?;
    info!(
        stop_reason = ?report.stop_reason,
        steps = report.steps_taken,
        states = report.states_discovered,
        output = %args.output.display(),
        "exploration complete"
    );
    println!(
        "explored {} states in {} steps ({:?}); artifacts in {}",
        report.states_discovered,
        report.steps_taken,
        report.stop_reason,
        args.output.display()
    );
    Ok(())
}

fn inspect(args: InspectArgs) -> Result<()> {
    let knowledge = artifacts::load_knowledge(&args.knowledge)
        .with_context(|| format!("loading {}", args.knowledge.display()))?;

    println!(
        "{} states, {} actions, {} edges, {} unexplored",
        knowledge.states.len(),
        knowledge.actions.len(),
        knowledge.graph.edge_count(),
        knowledge.unexplored().len()
    );
    for state in knowledge.states.values() {
        let url = state
            .snapshots
            .first()
            .map(|snap| snap.url.as_str())
            .unwrap_or("<no snapshot>");
        println!(
            "  {}  sig={}  actions={}  {}",
            state.id,
            &state.signature[..state.signature.len().min(16)],
            state.actions.len(),
            url
        );
    }
    Ok(())
}
