//! pgosync — keep a repository's PGO profile fresh via pull requests.
//!
//! # Usage
//!
//! ```text
//! pgosync --config pgosync.yaml
//! ```
//!
//! One invocation samples a CPU profile from the configured service,
//! compares it with the artifact on the base branch, and, when the bytes
//! differ, pushes a commit to the head branch and opens (or reuses) the
//! managed pull request. Exits non-zero on any failure.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pgosync_core::{Dependencies, RunResult, Service};
use pgosync_github::{GitHubClient, GitHubClientOptions};
use pgosync_profile::{HttpProfileFetcher, PprofValidator};

use config::ConfigFile;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pgosync",
    version,
    about = "Sync a sampled CPU profile into a repository pull request",
    long_about = None,
)]
struct Cli {
    /// Path to the pgosync YAML configuration file.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = config::load(&cli.config)?;
    let request = config::build_run_request(&cfg)?;
    let deadline = config::run_timeout(&cfg)?;

    tracing::info!(config_path = %cli.config.display(), "starting pgosync run");

    let service = build_service(&cfg)?;
    let result = tokio::time::timeout(deadline, service.run(request))
        .await
        .map_err(|_| anyhow!("run exceeded deadline of {}", humantime::format_duration(deadline)))??;

    tracing::info!(
        base_branch = %result.base_branch,
        head_branch = %result.head_branch,
        pr_number = result.pull_request_number.unwrap_or(0),
        commit_sha = result.commit_sha.as_deref().unwrap_or(""),
        changed = result.profile_changed,
        pr_created = result.pull_request_created,
        noop = result.noop,
        "completed pgosync run"
    );
    println!("{}", summary_line(&result));

    Ok(())
}

/// Wire the adapter crates into an executable service.
fn build_service(cfg: &ConfigFile) -> Result<Service> {
    let fetcher = HttpProfileFetcher::new(config::profile_timeout(cfg)?)?;
    let github = Arc::new(GitHubClient::new(GitHubClientOptions {
        api_url: config::github_api_url(cfg)?,
        token: config::github_token(cfg)?,
        timeout: config::github_timeout(cfg)?,
    })?);

    Ok(Service::new(Dependencies {
        profile_fetcher: Arc::new(fetcher),
        profile_validator: Arc::new(PprofValidator::new()),
        branch_writer: github.clone(),
        pull_requests: github,
    }))
}

fn summary_line(result: &RunResult) -> String {
    format!(
        "base_branch={} head_branch={} pr_number={} commit_sha={} changed={} pr_created={} noop={}",
        result.base_branch,
        result.head_branch,
        result.pull_request_number.unwrap_or(0),
        result.commit_sha.as_deref().unwrap_or(""),
        result.profile_changed,
        result.pull_request_created,
        result.noop,
    )
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
