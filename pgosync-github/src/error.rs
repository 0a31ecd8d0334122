//! Error types for pgosync-github.

use thiserror::Error;

/// All errors that can arise from GitHub API operations.
///
/// `Api` carries the failing operation name so callers see which git
/// object call failed; ref-mutation fallbacks inspect it to recognize the
/// "reference does not exist" condition.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The underlying HTTP client could not be constructed.
    #[error("build github http client: {0}")]
    BuildClient(#[source] reqwest::Error),

    /// The configured token cannot be encoded as an HTTP header value.
    #[error("github token is not a valid header value")]
    InvalidToken,

    /// A request URL could not be assembled from the base API URL.
    #[error("invalid api url: {0}")]
    Url(#[from] url::ParseError),

    /// Transport-level failure (connect, timeout, body read).
    #[error("{operation}: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response from the API.
    #[error("{operation}: unexpected status {status}: {message}")]
    Api {
        operation: String,
        status: reqwest::StatusCode,
        message: String,
    },

    /// A 2xx response whose body could not be decoded.
    #[error("{operation}: decode response: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    /// A required request field was blank.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// The repository reports no default branch.
    #[error("repository default branch is empty")]
    EmptyDefaultBranch,

    /// The API returned an object without a SHA.
    #[error("{object} has empty sha")]
    EmptySha { object: &'static str },

    /// The recursive tree listing was cut off before the artifact path
    /// could be resolved; a partial listing cannot prove absence.
    #[error("tree listing for tree {tree_sha} was truncated while resolving {path:?}")]
    TreeTruncated { tree_sha: String, path: String },

    /// The artifact path exists but is not a regular blob entry.
    #[error("path {path:?} is not a blob entry (found {entry_type:?})")]
    UnexpectedEntryType { path: String, entry_type: String },

    /// Both the ref creation and the follow-up force-update failed.
    #[error("create branch ref failed: {create}; retry force-update failed: {retry}")]
    RefUpdateConflict {
        create: Box<GitHubError>,
        retry: Box<GitHubError>,
    },
}

impl GitHubError {
    /// True for responses that mean "this ref/object does not exist":
    /// a plain 404, or GitHub's 422 "Reference does not exist" answer to
    /// a force-update of an absent branch.
    pub(crate) fn is_reference_missing(&self) -> bool {
        match self {
            GitHubError::Api {
                status, message, ..
            } => {
                status.as_u16() == 404
                    || (status.as_u16() == 422
                        && message.to_lowercase().contains("reference does not exist"))
            }
            _ => false,
        }
    }

    /// True for a plain 404 response.
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, GitHubError::Api { status, .. } if status.as_u16() == 404)
    }
}
