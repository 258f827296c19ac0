//! Mend - Autonomous Code-Healing CLI
//!
//! The `mend` command drives healing runs and inspects their records.
//!
//! ## Commands
//!
//! - `heal`: run one healing attempt against a repository
//! - `show`: print the result summary for a recorded run
//! - `list`: list recorded runs, newest first

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, Level};

use mend_core::report::build_summary;
use mend_core::{
    init_tracing, GitCli, HealConfig, HealOrchestrator, HealRequest, OpenAiSuggestions,
    ProcessTestExecutor,
};
use mend_state::{HealStore, RunId, SurrealHealStore};

#[derive(Parser)]
#[command(name = "mend")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Autonomous code-healing orchestrator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one healing attempt against a repository
    Heal {
        /// Repository clone URL
        #[arg(long)]
        repo: String,

        /// Requesting team name
        #[arg(long)]
        team: String,

        /// Team leader name
        #[arg(long)]
        leader: String,

        /// Maximum fix-apply-retest iterations (overrides MEND_RETRY_LIMIT)
        #[arg(long)]
        retry_limit: Option<u32>,
    },

    /// Show the result summary for a recorded run
    Show {
        /// Run ID to show
        run_id: String,
    },

    /// List recorded runs, newest first
    List {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Heal {
            repo,
            team,
            leader,
            retry_limit,
        } => heal(repo, team, leader, retry_limit).await,
        Commands::Show { run_id } => show(run_id).await,
        Commands::List { limit } => list(limit).await,
    }
}

async fn heal(repo: String, team: String, leader: String, retry_limit: Option<u32>) -> Result<()> {
    let mut config = HealConfig::from_env();
    if let Some(limit) = retry_limit {
        config.retry_limit = limit;
    }

    let store = Arc::new(
        SurrealHealStore::from_env()
            .await
            .context("failed to open heal store")?,
    );
    let vcs = Arc::new(GitCli::new(&config));
    let tests = Arc::new(ProcessTestExecutor::new(&config));
    let ai = Arc::new(OpenAiSuggestions::from_env().context("failed to build AI client")?);

    info!(repo = %repo, team = %team, retry_limit = config.retry_limit, "starting heal");
    let orchestrator = HealOrchestrator::new(config, store, vcs, tests, ai);
    let outcome = orchestrator
        .heal(HealRequest::new(repo, team, leader))
        .await?;

    println!("{}", outcome.message);
    println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    Ok(())
}

async fn show(run_id: String) -> Result<()> {
    let store = SurrealHealStore::from_env()
        .await
        .context("failed to open heal store")?;
    let retry_limit = HealConfig::from_env().retry_limit;

    let summary = build_summary(&store, &RunId(run_id), retry_limit).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn list(limit: usize) -> Result<()> {
    let store = SurrealHealStore::from_env()
        .await
        .context("failed to open heal store")?;

    let runs = store.list_runs().await?;
    if runs.is_empty() {
        println!("no runs recorded");
        return Ok(());
    }

    for run in runs.iter().take(limit) {
        println!(
            "{}  {:<10}  {:>3} fixes  {:>2} iterations  score {:>4}  {}",
            run.run_id,
            run.status.as_str(),
            run.fixes_applied,
            run.iterations_used,
            run.final_score,
            run.repo_url
        );
    }
    Ok(())
}
