//! Error types for pgosync-core.

use thiserror::Error;

use crate::ports::PortError;

/// All errors that can abort a run.
///
/// Each variant names the stage that failed; nothing below the orchestrator
/// is retried, so one of these is always terminal for the run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The request failed validation before any collaborator was called.
    #[error("invalid run request: {0}")]
    InvalidRequest(String),

    /// The profile source returned a transport or status error.
    #[error("fetch cpu profile: {0}")]
    Fetch(#[source] PortError),

    /// The fetched payload is not a usable CPU profile.
    #[error("validate cpu profile: {0}")]
    InvalidProfile(#[source] PortError),

    /// Default-branch lookup failed.
    #[error("resolve default branch: {0}")]
    BranchResolution(#[source] PortError),

    /// Default-branch lookup succeeded but returned a blank name.
    #[error("repository default branch is empty")]
    EmptyDefaultBranch,

    /// The open pull request lookup failed.
    #[error("find open pull request: {0}")]
    FindPullRequest(#[source] PortError),

    /// An open pull request occupies the head branch but lacks the
    /// managed-by marker. Safety guard: pgosync never touches a pull
    /// request it cannot prove it owns, so the run aborts before any
    /// repository mutation.
    #[error("open pull request #{number} is not managed by pgosync ({url})")]
    UnmanagedPullRequest { number: u64, url: String },

    /// Reading the current artifact from the base branch failed.
    #[error("read base branch artifact: {0}")]
    ReadArtifact(#[source] PortError),

    /// Writing the new commit or updating the head branch failed.
    #[error("update profile branch: {0}")]
    Write(#[source] PortError),

    /// Opening the pull request failed after the branch was updated.
    #[error("create pull request: {0}")]
    CreatePullRequest(#[source] PortError),
}
