//! Capability traits implemented by adapter crates.
//!
//! Flat trait-per-collaborator, no hierarchy: the orchestrator composes
//! exactly these four seams and nothing else. Implementations surface
//! their own error enums through [`PortError`]; the orchestrator wraps
//! them with stage context in [`crate::RunError`].

use async_trait::async_trait;

use crate::types::{
    CreatePullRequestRequest, FetchProfileRequest, FindPullRequestRequest, PullRequest,
    ReadFileRequest, ReadFileResult, RepositoryRef, UpsertFileRequest, UpsertFileResult,
};

/// Boxed adapter error threaded through port boundaries.
pub type PortError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Retrieves raw CPU profile data from a source endpoint.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Returns CPU profile bytes for one sampling request.
    async fn fetch_cpu_profile(&self, req: FetchProfileRequest) -> Result<Vec<u8>, PortError>;
}

/// Verifies that a fetched payload is a usable CPU profile.
pub trait ProfileValidator: Send + Sync {
    /// Rejects empty, malformed, or sample-free profile bytes.
    fn validate_cpu_profile(&self, raw: &[u8]) -> Result<(), PortError>;
}

/// Reads and mutates repository contents through a branch workflow.
#[async_trait]
pub trait BranchWriter: Send + Sync {
    /// Resolves the repository default branch name.
    async fn default_branch(&self, repository: &RepositoryRef) -> Result<String, PortError>;

    /// Reads file contents from a specific branch; absence is not an error.
    async fn read_file(&self, req: ReadFileRequest) -> Result<ReadFileResult, PortError>;

    /// Publishes a commit with one file changed and force-updates the head
    /// branch to point at it, creating the branch when absent.
    async fn upsert_file_and_force_branch(
        &self,
        req: UpsertFileRequest,
    ) -> Result<UpsertFileResult, PortError>;
}

/// Finds and creates pull requests for the automation branch pair.
#[async_trait]
pub trait PullRequestDirectory: Send + Sync {
    /// Finds the open pull request matching the base/head pair, if any.
    async fn find_open_by_head(
        &self,
        req: FindPullRequestRequest,
    ) -> Result<Option<PullRequest>, PortError>;

    /// Opens a new pull request for the prepared branch.
    async fn create(&self, req: CreatePullRequestRequest) -> Result<PullRequest, PortError>;
}
