//! Run orchestrator.
//!
//! ## `Service::run` — 9-step protocol
//!
//! 1. Normalize the request (defaults + required-field validation).
//! 2. Fetch profile bytes from the profile source.
//! 3. Validate the payload structurally.
//! 4. Resolve the base branch (configured value, else repository default).
//! 5. Look up an open pull request for the branch pair; abort with
//!    [`RunError::UnmanagedPullRequest`] if one exists without the marker.
//! 6. Read the current artifact from the base branch (absence is fine).
//! 7. Byte-equal artifact → return `noop`, reusing any found PR number.
//! 8. Upsert the artifact and force-update the head branch.
//! 9. Reuse the managed pull request if one was found, else create one
//!    whose body carries the managed-by marker.
//!
//! Strictly linear, no retries at this layer: any stage failure aborts the
//! run with a stage-identifying [`RunError`].

use std::sync::Arc;

use crate::error::RunError;
use crate::ports::{BranchWriter, ProfileFetcher, ProfileValidator, PullRequestDirectory};
use crate::types::{
    CreatePullRequestRequest, FetchProfileRequest, FindPullRequestRequest, ReadFileRequest,
    RepositoryRef, RunRequest, RunResult, UpsertFileRequest,
};

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

/// Runtime ports required by [`Service`].
#[derive(Clone)]
pub struct Dependencies {
    pub profile_fetcher: Arc<dyn ProfileFetcher>,
    pub profile_validator: Arc<dyn ProfileValidator>,
    pub branch_writer: Arc<dyn BranchWriter>,
    pub pull_requests: Arc<dyn PullRequestDirectory>,
}

/// Orchestrates one pgosync execution using injected ports.
pub struct Service {
    profile_fetcher: Arc<dyn ProfileFetcher>,
    profile_validator: Arc<dyn ProfileValidator>,
    branch_writer: Arc<dyn BranchWriter>,
    pull_requests: Arc<dyn PullRequestDirectory>,
}

impl Service {
    pub fn new(deps: Dependencies) -> Self {
        Self {
            profile_fetcher: deps.profile_fetcher,
            profile_validator: deps.profile_validator,
            branch_writer: deps.branch_writer,
            pull_requests: deps.pull_requests,
        }
    }

    /// Execute a full fetch-validate-write-pr cycle for one request.
    pub async fn run(&self, request: RunRequest) -> Result<RunResult, RunError> {
        let normalized = request.normalized()?;

        let repository = RepositoryRef {
            owner: normalized.repository.owner.clone(),
            name: normalized.repository.name.clone(),
        };

        let profile = self
            .profile_fetcher
            .fetch_cpu_profile(FetchProfileRequest {
                url: normalized.profile.url.clone(),
                seconds: normalized.profile.seconds,
                headers: normalized.profile.headers.clone(),
            })
            .await
            .map_err(RunError::Fetch)?;
        tracing::debug!(bytes = profile.len(), "fetched cpu profile");

        self.profile_validator
            .validate_cpu_profile(&profile)
            .map_err(RunError::InvalidProfile)?;

        let base_branch = self
            .resolve_base_branch(&repository, &normalized.repository.base_branch)
            .await?;

        let open_pr = self
            .pull_requests
            .find_open_by_head(FindPullRequestRequest {
                repository: repository.clone(),
                base_branch: base_branch.clone(),
                head_branch: normalized.repository.head_branch.clone(),
            })
            .await
            .map_err(RunError::FindPullRequest)?;

        if let Some(pr) = &open_pr {
            if !pr.is_managed(&normalized.pull_request.managed_by_marker) {
                return Err(RunError::UnmanagedPullRequest {
                    number: pr.number,
                    url: pr.url.clone(),
                });
            }
        }

        let current = self
            .branch_writer
            .read_file(ReadFileRequest {
                repository: repository.clone(),
                branch: base_branch.clone(),
                path: normalized.repository.artifact_path.clone(),
            })
            .await
            .map_err(RunError::ReadArtifact)?;

        if current.exists && current.content == profile {
            tracing::info!(base_branch, "artifact already up to date");
            return Ok(RunResult {
                base_branch,
                head_branch: normalized.repository.head_branch,
                pull_request_number: open_pr.map(|pr| pr.number),
                noop: true,
                ..RunResult::default()
            });
        }

        let write = self
            .branch_writer
            .upsert_file_and_force_branch(UpsertFileRequest {
                repository: repository.clone(),
                base_branch: base_branch.clone(),
                head_branch: normalized.repository.head_branch.clone(),
                path: normalized.repository.artifact_path.clone(),
                content: profile,
                commit_message: normalized.commit.message.clone(),
            })
            .await
            .map_err(RunError::Write)?;
        tracing::info!(
            commit_sha = %write.commit_sha,
            branch_created = write.branch_created,
            "updated profile branch"
        );

        let mut result = RunResult {
            base_branch: base_branch.clone(),
            head_branch: normalized.repository.head_branch.clone(),
            commit_sha: Some(write.commit_sha),
            profile_changed: true,
            ..RunResult::default()
        };

        if let Some(pr) = open_pr {
            result.pull_request_number = Some(pr.number);
            return Ok(result);
        }

        let created = self
            .pull_requests
            .create(CreatePullRequestRequest {
                repository,
                base_branch,
                head_branch: normalized.repository.head_branch,
                title: normalized.pull_request.title,
                body: append_marker(
                    &normalized.pull_request.body,
                    &normalized.pull_request.managed_by_marker,
                ),
            })
            .await
            .map_err(RunError::CreatePullRequest)?;
        tracing::info!(pr_number = created.number, url = %created.url, "opened pull request");

        result.pull_request_number = Some(created.number);
        result.pull_request_created = true;

        Ok(result)
    }

    /// Pick the configured base branch or the repository default.
    async fn resolve_base_branch(
        &self,
        repository: &RepositoryRef,
        configured: &str,
    ) -> Result<String, RunError> {
        if !configured.trim().is_empty() {
            return Ok(configured.to_string());
        }

        let base_branch = self
            .branch_writer
            .default_branch(repository)
            .await
            .map_err(RunError::BranchResolution)?;

        if base_branch.trim().is_empty() {
            return Err(RunError::EmptyDefaultBranch);
        }

        Ok(base_branch)
    }
}

// ---------------------------------------------------------------------------
// Marker append
// ---------------------------------------------------------------------------

/// Append the managed-by marker to a pull request body.
///
/// Idempotent and order-preserving: existing text first, then a blank line,
/// then the marker. A body that already contains the marker is returned
/// unchanged; a blank body becomes the bare marker.
pub fn append_marker(body: &str, marker: &str) -> String {
    if body.contains(marker) {
        return body.to_string();
    }

    if body.trim().is_empty() {
        return marker.to_string();
    }

    format!("{}\n\n{}", body.trim_end_matches('\n'), marker)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
