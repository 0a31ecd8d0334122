//! Serde mirrors of the GitHub REST payloads pgosync touches.
//!
//! Only the fields the adapter reads or writes are modeled; everything
//! else in the responses is ignored.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RepositoryResponse {
    #[serde(default)]
    pub default_branch: String,
}

// ---------------------------------------------------------------------------
// Git objects
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GitRefResponse {
    pub object: GitRefObject,
}

#[derive(Debug, Deserialize)]
pub struct GitRefObject {
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct GitCommitResponse {
    #[serde(default)]
    pub sha: String,
    pub tree: GitTreeRef,
}

#[derive(Debug, Deserialize)]
pub struct GitTreeRef {
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct GitTreeResponse {
    #[serde(default)]
    pub tree: Vec<GitTreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Deserialize)]
pub struct GitTreeEntry {
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type", default)]
    pub entry_type: String,
    #[serde(default)]
    pub sha: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateBlobRequest {
    pub content: String,
    pub encoding: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CreateBlobResponse {
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub struct CreateTreeRequest {
    pub base_tree: String,
    pub tree: Vec<NewTreeEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTreeResponse {
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub struct NewTreeEntry {
    pub path: String,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub entry_type: &'static str,
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub struct CreateCommitRequest {
    pub message: String,
    pub tree: String,
    pub parents: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommitResponse {
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateRefRequest {
    pub sha: String,
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateRefRequest {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: String,
}

// ---------------------------------------------------------------------------
// Pull requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PullRequestResponse {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Serialize)]
pub struct CreatePullRequestBody {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// GitHub's error envelope; `errors` items vary in shape, so they are kept
/// as raw values and rendered into the message text.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

impl ApiErrorBody {
    /// Collapse the envelope into one human-readable line.
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        if !self.message.is_empty() {
            parts.push(self.message.clone());
        }
        for item in &self.errors {
            match item {
                serde_json::Value::String(s) => parts.push(s.clone()),
                serde_json::Value::Object(map) => {
                    if let Some(serde_json::Value::String(s)) = map.get("message") {
                        parts.push(s.clone());
                    }
                }
                _ => {}
            }
        }
        parts.join("; ")
    }
}
