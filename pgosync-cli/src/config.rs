//! YAML runtime configuration for the `pgosync` binary.
//!
//! ```yaml
//! profile:
//!   url: http://svc.internal:6060/debug/pprof/profile
//!   seconds: 30
//!   timeout: 45s
//!   headers:
//!     Authorization: Bearer profile-token
//! repository:
//!   owner: acme
//!   name: api
//!   artifact_path: default.pgo
//!   base_branch: ""        # blank = repository default branch
//!   head_branch: pgosync
//! github:
//!   token: ghp_...          # or the GITHUB_TOKEN environment variable
//!   api_url: https://api.github.com
//!   timeout: 30s
//! pull_request:
//!   title: ""
//!   body: ""
//!   managed_by_marker: ""
//! commit:
//!   message: ""
//! runtime:
//!   timeout: 2m
//! ```
//!
//! Blank strings defer to pgosync defaults; normalization in
//! `pgosync-core` fills pull request and commit literals.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use pgosync_core::{
    CommitSettings, ProfileSettings, PullRequestSettings, RepositorySettings, RunRequest,
};

const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_GITHUB_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_API_URL: &str = "https://api.github.com";
const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// All errors that can arise from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading the config file.
    #[error("read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with file path context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required field is blank in both config and environment.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// A URL field failed to parse.
    #[error("parse {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    /// A duration field failed to parse.
    #[error("parse {field}: {source}")]
    InvalidDuration {
        field: &'static str,
        #[source]
        source: humantime::DurationError,
    },

    /// A duration field parsed to zero.
    #[error("{field} must be positive")]
    NonPositiveDuration { field: &'static str },
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Root pgosync runtime configuration document.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub profile: ProfileConfig,
    pub repository: RepositoryConfig,
    pub github: GitHubConfig,
    pub pull_request: PullRequestConfig,
    pub commit: CommitConfig,
    pub runtime: RuntimeConfig,
}

/// CPU profile collection settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub url: String,
    pub seconds: u32,
    pub timeout: String,
    pub headers: HashMap<String, String>,
}

/// Where pgosync writes profile updates.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub owner: String,
    pub name: String,
    pub artifact_path: String,
    pub base_branch: String,
    pub head_branch: String,
}

/// GitHub API access settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub token: String,
    pub api_url: String,
    pub timeout: String,
}

/// Metadata for pgosync-managed pull requests.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PullRequestConfig {
    pub title: String,
    pub body: String,
    pub managed_by_marker: String,
}

/// Commit metadata for generated updates.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommitConfig {
    pub message: String,
}

/// Top-level execution timing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub timeout: String,
}

// ---------------------------------------------------------------------------
// Loading and mapping
// ---------------------------------------------------------------------------

/// Read and decode a pgosync configuration file from disk.
pub fn load(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Map configuration data into a run request.
///
/// Only the profile URL is validated here; everything else is left to
/// `RunRequest::normalized`.
pub fn build_run_request(cfg: &ConfigFile) -> Result<RunRequest, ConfigError> {
    let url_text = cfg.profile.url.trim();
    if url_text.is_empty() {
        return Err(ConfigError::MissingField {
            field: "profile url",
        });
    }
    let url = Url::parse(url_text).map_err(|source| ConfigError::InvalidUrl {
        field: "profile url",
        source,
    })?;

    Ok(RunRequest {
        profile: ProfileSettings {
            url,
            seconds: cfg.profile.seconds,
            headers: cfg.profile.headers.clone(),
        },
        repository: RepositorySettings {
            owner: cfg.repository.owner.trim().to_string(),
            name: cfg.repository.name.trim().to_string(),
            artifact_path: cfg.repository.artifact_path.trim().to_string(),
            base_branch: cfg.repository.base_branch.trim().to_string(),
            head_branch: cfg.repository.head_branch.trim().to_string(),
        },
        pull_request: PullRequestSettings {
            title: cfg.pull_request.title.trim().to_string(),
            body: cfg.pull_request.body.trim().to_string(),
            managed_by_marker: cfg.pull_request.managed_by_marker.trim().to_string(),
        },
        commit: CommitSettings {
            message: cfg.commit.message.trim().to_string(),
        },
    })
}

/// Total run deadline (default 2 m).
pub fn run_timeout(cfg: &ConfigFile) -> Result<Duration, ConfigError> {
    parse_duration_or_default(&cfg.runtime.timeout, DEFAULT_RUN_TIMEOUT, "runtime timeout")
}

/// Per-request timeout for profile collection (default 45 s; must cover
/// the whole sampling window).
pub fn profile_timeout(cfg: &ConfigFile) -> Result<Duration, ConfigError> {
    parse_duration_or_default(
        &cfg.profile.timeout,
        pgosync_profile::fetcher::DEFAULT_FETCH_TIMEOUT,
        "profile timeout",
    )
}

/// Per-request timeout for GitHub API calls (default 30 s).
pub fn github_timeout(cfg: &ConfigFile) -> Result<Duration, ConfigError> {
    parse_duration_or_default(&cfg.github.timeout, DEFAULT_GITHUB_TIMEOUT, "github timeout")
}

/// GitHub API root (default `https://api.github.com`).
pub fn github_api_url(cfg: &ConfigFile) -> Result<Url, ConfigError> {
    let raw = cfg.github.api_url.trim();
    let raw = if raw.is_empty() { DEFAULT_API_URL } else { raw };
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        field: "github api url",
        source,
    })
}

/// Token from config, else the `GITHUB_TOKEN` environment variable.
pub fn github_token(cfg: &ConfigFile) -> Result<String, ConfigError> {
    let configured = cfg.github.token.trim();
    if !configured.is_empty() {
        return Ok(configured.to_string());
    }

    match std::env::var(TOKEN_ENV_VAR) {
        Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(ConfigError::MissingField {
            field: "github token",
        }),
    }
}

fn parse_duration_or_default(
    raw: &str,
    default: Duration,
    field: &'static str,
) -> Result<Duration, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(default);
    }

    let parsed = humantime::parse_duration(raw)
        .map_err(|source| ConfigError::InvalidDuration { field, source })?;
    if parsed.is_zero() {
        return Err(ConfigError::NonPositiveDuration { field });
    }

    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
