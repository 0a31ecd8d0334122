//! Domain types for a pgosync run.
//!
//! A [`RunRequest`] describes one complete refresh operation; calling
//! [`RunRequest::normalized`] validates required fields and fills defaults.
//! The port request/result structs mirror the method signatures in
//! [`crate::ports`] so adapter crates share one vocabulary with the core.

use std::collections::HashMap;

use url::Url;

use crate::error::RunError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// CPU profile sampling window applied when the request leaves seconds unset.
pub const DEFAULT_PROFILE_SECONDS: u32 = 30;

/// Branch receiving refreshed profile commits.
pub const DEFAULT_HEAD_BRANCH: &str = "pgosync";

/// Sentinel substring identifying a pull request as pgosync-managed.
///
/// This is the only ownership signal persisted across runs; it must stay
/// textually stable or future runs will refuse to touch their own PRs.
pub const DEFAULT_MANAGED_BY_MARKER: &str = "<!-- managed-by:pgosync -->";

/// Default pull request title.
pub const DEFAULT_PR_TITLE: &str = "perf(pgo): refresh pgo profile";

/// Default pull request body (the marker is appended separately).
pub const DEFAULT_PR_BODY: &str = "Automated PGO profile refresh.";

/// Default commit message for profile update commits.
pub const DEFAULT_COMMIT_MESSAGE: &str = "perf(pgo): refresh pgo profile";

// ---------------------------------------------------------------------------
// Repository identity
// ---------------------------------------------------------------------------

/// Immutable identity of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Run request
// ---------------------------------------------------------------------------

/// One complete pgosync refresh operation.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub profile: ProfileSettings,
    pub repository: RepositorySettings,
    pub pull_request: PullRequestSettings,
    pub commit: CommitSettings,
}

/// Where and how to collect the CPU profile.
#[derive(Debug, Clone)]
pub struct ProfileSettings {
    pub url: Url,
    /// Sampling window in seconds; `0` means "use the default".
    pub seconds: u32,
    pub headers: HashMap<String, String>,
}

/// Target repository and branch strategy.
#[derive(Debug, Clone)]
pub struct RepositorySettings {
    pub owner: String,
    pub name: String,
    /// Path of the tracked profile artifact inside the repository tree.
    pub artifact_path: String,
    /// Base branch; blank means "resolve the repository default branch".
    pub base_branch: String,
    pub head_branch: String,
}

/// Identity and metadata for the automation pull request.
#[derive(Debug, Clone)]
pub struct PullRequestSettings {
    pub title: String,
    pub body: String,
    pub managed_by_marker: String,
}

/// Commit metadata for profile updates.
#[derive(Debug, Clone)]
pub struct CommitSettings {
    pub message: String,
}

impl RunRequest {
    /// Validate required fields and apply pgosync defaults.
    pub fn normalized(self) -> Result<RunRequest, RunError> {
        let mut normalized = self;

        if !normalized.profile.url.has_host() {
            return Err(RunError::InvalidRequest(
                "profile url must include scheme and host".to_string(),
            ));
        }

        if normalized.profile.seconds == 0 {
            normalized.profile.seconds = DEFAULT_PROFILE_SECONDS;
        }

        if normalized.repository.owner.trim().is_empty() {
            return Err(RunError::InvalidRequest(
                "repository owner is required".to_string(),
            ));
        }

        if normalized.repository.name.trim().is_empty() {
            return Err(RunError::InvalidRequest(
                "repository name is required".to_string(),
            ));
        }

        if normalized.repository.artifact_path.trim().is_empty() {
            return Err(RunError::InvalidRequest(
                "repository artifact path is required".to_string(),
            ));
        }

        if normalized.repository.head_branch.trim().is_empty() {
            normalized.repository.head_branch = DEFAULT_HEAD_BRANCH.to_string();
        }

        if normalized.pull_request.managed_by_marker.trim().is_empty() {
            normalized.pull_request.managed_by_marker = DEFAULT_MANAGED_BY_MARKER.to_string();
        }

        if normalized.pull_request.title.trim().is_empty() {
            normalized.pull_request.title = DEFAULT_PR_TITLE.to_string();
        }

        if normalized.pull_request.body.trim().is_empty() {
            normalized.pull_request.body = DEFAULT_PR_BODY.to_string();
        }

        if normalized.commit.message.trim().is_empty() {
            normalized.commit.message = DEFAULT_COMMIT_MESSAGE.to_string();
        }

        Ok(normalized)
    }
}

// ---------------------------------------------------------------------------
// Pull request record
// ---------------------------------------------------------------------------

/// Subset of pull request metadata used by pgosync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub url: String,
}

impl PullRequest {
    /// A pull request is managed by pgosync iff its body contains the marker.
    pub fn is_managed(&self, marker: &str) -> bool {
        self.body.contains(marker)
    }
}

// ---------------------------------------------------------------------------
// Run result
// ---------------------------------------------------------------------------

/// Summary of what changed during one run. Pure output, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub base_branch: String,
    pub head_branch: String,
    pub pull_request_number: Option<u64>,
    pub commit_sha: Option<String>,
    pub profile_changed: bool,
    pub pull_request_created: bool,
    pub noop: bool,
}

// ---------------------------------------------------------------------------
// Port request/result structs
// ---------------------------------------------------------------------------

/// One CPU profile fetch operation.
#[derive(Debug, Clone)]
pub struct FetchProfileRequest {
    pub url: Url,
    pub seconds: u32,
    pub headers: HashMap<String, String>,
}

/// Selects a file on a specific repository branch.
#[derive(Debug, Clone)]
pub struct ReadFileRequest {
    pub repository: RepositoryRef,
    pub branch: String,
    pub path: String,
}

/// An optional file read; `exists == false` means the path was absent.
#[derive(Debug, Clone, Default)]
pub struct ReadFileResult {
    pub content: Vec<u8>,
    pub exists: bool,
}

/// A commit-and-force-update operation for one file on the head branch.
#[derive(Debug, Clone)]
pub struct UpsertFileRequest {
    pub repository: RepositoryRef,
    pub base_branch: String,
    pub head_branch: String,
    pub path: String,
    pub content: Vec<u8>,
    pub commit_message: String,
}

/// Outcome of a branch upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertFileResult {
    pub commit_sha: String,
    pub branch_created: bool,
}

/// Targets a pull request lookup by repository and branch pair.
#[derive(Debug, Clone)]
pub struct FindPullRequestRequest {
    pub repository: RepositoryRef,
    pub base_branch: String,
    pub head_branch: String,
}

/// Fields for opening a new pull request.
#[derive(Debug, Clone)]
pub struct CreatePullRequestRequest {
    pub repository: RepositoryRef,
    pub base_branch: String,
    pub head_branch: String,
    pub title: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RunRequest {
        RunRequest {
            profile: ProfileSettings {
                url: Url::parse("http://svc.internal/debug/pprof/profile").unwrap(),
                seconds: 0,
                headers: HashMap::new(),
            },
            repository: RepositorySettings {
                owner: "acme".to_string(),
                name: "api".to_string(),
                artifact_path: "default.pgo".to_string(),
                base_branch: String::new(),
                head_branch: String::new(),
            },
            pull_request: PullRequestSettings {
                title: String::new(),
                body: String::new(),
                managed_by_marker: String::new(),
            },
            commit: CommitSettings {
                message: String::new(),
            },
        }
    }

    #[test]
    fn normalized_fills_defaults() {
        let normalized = request().normalized().expect("normalize");
        assert_eq!(normalized.profile.seconds, DEFAULT_PROFILE_SECONDS);
        assert_eq!(normalized.repository.head_branch, DEFAULT_HEAD_BRANCH);
        assert_eq!(
            normalized.pull_request.managed_by_marker,
            DEFAULT_MANAGED_BY_MARKER
        );
        assert_eq!(normalized.pull_request.title, DEFAULT_PR_TITLE);
        assert_eq!(normalized.pull_request.body, DEFAULT_PR_BODY);
        assert_eq!(normalized.commit.message, DEFAULT_COMMIT_MESSAGE);
    }

    #[test]
    fn normalized_keeps_explicit_values() {
        let mut req = request();
        req.profile.seconds = 10;
        req.repository.base_branch = "release".to_string();
        req.repository.head_branch = "perf/pgo".to_string();
        req.pull_request.title = "custom title".to_string();

        let normalized = req.normalized().expect("normalize");
        assert_eq!(normalized.profile.seconds, 10);
        assert_eq!(normalized.repository.base_branch, "release");
        assert_eq!(normalized.repository.head_branch, "perf/pgo");
        assert_eq!(normalized.pull_request.title, "custom title");
    }

    #[test]
    fn normalized_rejects_blank_owner() {
        let mut req = request();
        req.repository.owner = "  ".to_string();
        let err = req.normalized().expect_err("should fail");
        assert!(matches!(err, RunError::InvalidRequest(_)));
    }

    #[test]
    fn normalized_rejects_blank_artifact_path() {
        let mut req = request();
        req.repository.artifact_path = String::new();
        let err = req.normalized().expect_err("should fail");
        assert!(matches!(err, RunError::InvalidRequest(_)));
    }

    #[test]
    fn normalized_rejects_hostless_url() {
        let mut req = request();
        req.profile.url = Url::parse("unix:/var/run/svc.sock").unwrap();
        let err = req.normalized().expect_err("should fail");
        assert!(matches!(err, RunError::InvalidRequest(_)));
    }

    #[test]
    fn managed_marker_detection() {
        let pr = PullRequest {
            number: 7,
            title: "t".to_string(),
            body: format!("hello\n\n{DEFAULT_MANAGED_BY_MARKER}"),
            url: String::new(),
        };
        assert!(pr.is_managed(DEFAULT_MANAGED_BY_MARKER));
        assert!(!pr.is_managed("<!-- someone-else -->"));
    }
}
