//! GitHub REST client implementing the branch-writer and pull-request
//! directory ports.
//!
//! ## `upsert_file_and_force_branch` — git object chain
//!
//! 1. Resolve the base branch ref → base commit SHA → base tree SHA.
//! 2. Create a blob from the artifact content (base64 upload).
//! 3. Create a tree equal to the base tree with the artifact path replaced.
//! 4. Create a commit with that tree and the base commit as sole parent.
//! 5. Force-update the head ref; if the ref does not exist, create it; if
//!    creation races with another actor, retry the force-update once.
//!
//! Objects left behind by a failed run are unreferenced and inert; no
//! rollback is attempted.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use pgosync_core::{
    BranchWriter, CreatePullRequestRequest, FindPullRequestRequest, PortError, PullRequest,
    PullRequestDirectory, ReadFileRequest, ReadFileResult, RepositoryRef, UpsertFileRequest,
    UpsertFileResult,
};

use crate::api::{
    ApiErrorBody, CreateBlobRequest, CreateBlobResponse, CreateCommitRequest,
    CreateCommitResponse, CreatePullRequestBody, CreateRefRequest, CreateTreeRequest,
    CreateTreeResponse, GitCommitResponse, GitRefResponse, GitTreeResponse, NewTreeEntry,
    PullRequestResponse, RepositoryResponse, UpdateRefRequest,
};
use crate::error::GitHubError;

const FILE_MODE_REGULAR: &str = "100644";
const TREE_ENTRY_BLOB: &str = "blob";
const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_RAW: &str = "application/vnd.github.raw+json";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT_VALUE: &str = concat!("pgosync/", env!("CARGO_PKG_VERSION"));
const ERROR_PREVIEW_LIMIT: usize = 512;

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Connection settings for [`GitHubClient`].
#[derive(Debug, Clone)]
pub struct GitHubClientOptions {
    /// API root, e.g. `https://api.github.com`.
    pub api_url: Url,
    /// Already-minted token; pgosync does no credential minting itself.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// GitHub REST adapter. Cheap to clone; holds only the HTTP client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: Url,
}

impl GitHubClient {
    pub fn new(options: GitHubClientOptions) -> Result<Self, GitHubError> {
        if options.token.trim().is_empty() {
            return Err(GitHubError::MissingField {
                field: "github token",
            });
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", options.token.trim()))
            .map_err(|_| GitHubError::InvalidToken)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(API_VERSION),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT_VALUE)
            .timeout(options.timeout)
            .build()
            .map_err(GitHubError::BuildClient)?;

        // Url::join treats the last path segment of a slash-less base as a
        // file and would drop it; normalize once here.
        let mut base_url = options.api_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GitHubError> {
        Ok(self.base_url.join(path)?)
    }
}

// ---------------------------------------------------------------------------
// Request plumbing
// ---------------------------------------------------------------------------

impl GitHubClient {
    async fn request_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        operation: String,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, GitHubError> {
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| GitHubError::Transport {
            operation: operation.clone(),
            source,
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| GitHubError::Transport {
            operation: operation.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(api_error(operation, status, &text));
        }

        serde_json::from_str(&text).map_err(|source| GitHubError::Decode { operation, source })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: String,
        url: Url,
    ) -> Result<T, GitHubError> {
        self.request_json::<T, ()>(Method::GET, operation, url, None).await
    }

    /// GET returning raw bytes (blob content via the raw media type).
    async fn get_raw(&self, operation: String, url: Url) -> Result<Vec<u8>, GitHubError> {
        let response = self
            .http
            .get(url)
            .header(ACCEPT, ACCEPT_RAW)
            .send()
            .await
            .map_err(|source| GitHubError::Transport {
                operation: operation.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(operation, status, &text));
        }

        let bytes = response.bytes().await.map_err(|source| GitHubError::Transport {
            operation,
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

fn api_error(operation: String, status: StatusCode, body: &str) -> GitHubError {
    let message = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(envelope) => envelope.render(),
        Err(_) => preview(body),
    };
    GitHubError::Api {
        operation,
        status,
        message,
    }
}

fn preview(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= ERROR_PREVIEW_LIMIT {
        return trimmed.to_string();
    }
    let mut end = ERROR_PREVIEW_LIMIT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

fn validate_repository_ref(repository: &RepositoryRef) -> Result<(), GitHubError> {
    if repository.owner.trim().is_empty() {
        return Err(GitHubError::MissingField {
            field: "repository owner",
        });
    }
    if repository.name.trim().is_empty() {
        return Err(GitHubError::MissingField {
            field: "repository name",
        });
    }
    Ok(())
}

fn require(value: &str, field: &'static str) -> Result<(), GitHubError> {
    if value.trim().is_empty() {
        return Err(GitHubError::MissingField { field });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Branch writer operations
// ---------------------------------------------------------------------------

impl GitHubClient {
    async fn default_branch_inner(
        &self,
        repository: &RepositoryRef,
    ) -> Result<String, GitHubError> {
        validate_repository_ref(repository)?;

        let url = self.endpoint(&format!(
            "repos/{}/{}",
            repository.owner, repository.name
        ))?;
        let repo: RepositoryResponse =
            self.get_json("get repository".to_string(), url).await?;

        let default_branch = repo.default_branch.trim().to_string();
        if default_branch.is_empty() {
            return Err(GitHubError::EmptyDefaultBranch);
        }

        Ok(default_branch)
    }

    /// Resolve `branch` to its commit and tree SHAs.
    async fn base_commit_tree(
        &self,
        repository: &RepositoryRef,
        branch: &str,
    ) -> Result<(String, String), GitHubError> {
        let url = self.endpoint(&format!(
            "repos/{}/{}/git/ref/heads/{}",
            repository.owner, repository.name, branch
        ))?;
        let git_ref: GitRefResponse = self
            .get_json(format!("get ref for branch {branch}"), url)
            .await?;

        let commit_sha = git_ref.object.sha.trim().to_string();
        if commit_sha.is_empty() {
            return Err(GitHubError::EmptySha {
                object: "base branch ref",
            });
        }

        let url = self.endpoint(&format!(
            "repos/{}/{}/git/commits/{}",
            repository.owner, repository.name, commit_sha
        ))?;
        let commit: GitCommitResponse = self
            .get_json(format!("get commit {commit_sha}"), url)
            .await?;

        let tree_sha = commit.tree.sha.trim().to_string();
        if tree_sha.is_empty() {
            return Err(GitHubError::EmptySha {
                object: "base commit tree",
            });
        }

        Ok((commit_sha, tree_sha))
    }

    async fn read_file_inner(
        &self,
        req: &ReadFileRequest,
    ) -> Result<ReadFileResult, GitHubError> {
        validate_repository_ref(&req.repository)?;
        require(&req.branch, "branch")?;
        require(&req.path, "path")?;

        let (_, base_tree_sha) = self.base_commit_tree(&req.repository, &req.branch).await?;

        let mut url = self.endpoint(&format!(
            "repos/{}/{}/git/trees/{}",
            req.repository.owner, req.repository.name, base_tree_sha
        ))?;
        url.query_pairs_mut().append_pair("recursive", "1");
        let tree: GitTreeResponse = self
            .get_json(format!("get tree {base_tree_sha}"), url)
            .await?;

        let mut blob_sha = String::new();
        for entry in &tree.tree {
            if entry.path != req.path {
                continue;
            }

            if entry.entry_type != TREE_ENTRY_BLOB {
                return Err(GitHubError::UnexpectedEntryType {
                    path: req.path.clone(),
                    entry_type: entry.entry_type.clone(),
                });
            }

            blob_sha = entry.sha.clone().unwrap_or_default().trim().to_string();
            break;
        }

        if blob_sha.is_empty() {
            if tree.truncated {
                return Err(GitHubError::TreeTruncated {
                    tree_sha: base_tree_sha,
                    path: req.path.clone(),
                });
            }
            return Ok(ReadFileResult::default());
        }

        let url = self.endpoint(&format!(
            "repos/{}/{}/git/blobs/{}",
            req.repository.owner, req.repository.name, blob_sha
        ))?;
        match self.get_raw(format!("get blob {blob_sha}"), url).await {
            Ok(content) => Ok(ReadFileResult {
                content,
                exists: true,
            }),
            // Tolerates a race between the tree listing and blob retrieval.
            Err(err) if err.is_not_found() => Ok(ReadFileResult::default()),
            Err(err) => Err(err),
        }
    }

    async fn upsert_inner(
        &self,
        req: &UpsertFileRequest,
    ) -> Result<UpsertFileResult, GitHubError> {
        validate_repository_ref(&req.repository)?;
        require(&req.base_branch, "base branch")?;
        require(&req.head_branch, "head branch")?;
        require(&req.path, "path")?;
        require(&req.commit_message, "commit message")?;

        let (base_commit_sha, base_tree_sha) = self
            .base_commit_tree(&req.repository, &req.base_branch)
            .await?;

        let blob_sha = self.create_blob(&req.repository, &req.content).await?;
        tracing::debug!(%blob_sha, "created blob");

        let tree_sha = self
            .create_tree(&req.repository, &req.path, &base_tree_sha, &blob_sha)
            .await?;
        tracing::debug!(%tree_sha, "created tree");

        let commit_sha = self
            .create_commit(
                &req.repository,
                &req.commit_message,
                &tree_sha,
                &base_commit_sha,
            )
            .await?;
        tracing::debug!(%commit_sha, "created commit");

        let branch_created = self
            .update_head_ref(&req.repository, &req.head_branch, &commit_sha)
            .await?;

        Ok(UpsertFileResult {
            commit_sha,
            branch_created,
        })
    }

    async fn create_blob(
        &self,
        repository: &RepositoryRef,
        content: &[u8],
    ) -> Result<String, GitHubError> {
        let url = self.endpoint(&format!(
            "repos/{}/{}/git/blobs",
            repository.owner, repository.name
        ))?;
        let response: CreateBlobResponse = self
            .request_json(
                Method::POST,
                "create blob".to_string(),
                url,
                Some(&CreateBlobRequest {
                    content: base64::engine::general_purpose::STANDARD.encode(content),
                    encoding: "base64",
                }),
            )
            .await?;

        let sha = response.sha.trim().to_string();
        if sha.is_empty() {
            return Err(GitHubError::EmptySha {
                object: "created blob",
            });
        }
        Ok(sha)
    }

    async fn create_tree(
        &self,
        repository: &RepositoryRef,
        path: &str,
        base_tree_sha: &str,
        blob_sha: &str,
    ) -> Result<String, GitHubError> {
        let url = self.endpoint(&format!(
            "repos/{}/{}/git/trees",
            repository.owner, repository.name
        ))?;
        let response: CreateTreeResponse = self
            .request_json(
                Method::POST,
                format!("create tree from base {base_tree_sha}"),
                url,
                Some(&CreateTreeRequest {
                    base_tree: base_tree_sha.to_string(),
                    tree: vec![NewTreeEntry {
                        path: path.to_string(),
                        mode: FILE_MODE_REGULAR,
                        entry_type: TREE_ENTRY_BLOB,
                        sha: blob_sha.to_string(),
                    }],
                }),
            )
            .await?;

        let sha = response.sha.trim().to_string();
        if sha.is_empty() {
            return Err(GitHubError::EmptySha {
                object: "created tree",
            });
        }
        Ok(sha)
    }

    async fn create_commit(
        &self,
        repository: &RepositoryRef,
        message: &str,
        tree_sha: &str,
        parent_commit_sha: &str,
    ) -> Result<String, GitHubError> {
        let url = self.endpoint(&format!(
            "repos/{}/{}/git/commits",
            repository.owner, repository.name
        ))?;
        let response: CreateCommitResponse = self
            .request_json(
                Method::POST,
                format!("create commit with tree {tree_sha}"),
                url,
                Some(&CreateCommitRequest {
                    message: message.to_string(),
                    tree: tree_sha.to_string(),
                    parents: vec![parent_commit_sha.to_string()],
                }),
            )
            .await?;

        let sha = response.sha.trim().to_string();
        if sha.is_empty() {
            return Err(GitHubError::EmptySha {
                object: "created commit",
            });
        }
        Ok(sha)
    }

    /// Force-update the head ref, creating it when absent. At most two ref
    /// mutations happen per call: the fallback create plus one retried
    /// force-update when another actor created the ref concurrently.
    async fn update_head_ref(
        &self,
        repository: &RepositoryRef,
        head_branch: &str,
        commit_sha: &str,
    ) -> Result<bool, GitHubError> {
        match self.force_update_ref(repository, head_branch, commit_sha).await {
            Ok(()) => return Ok(false),
            Err(err) if err.is_reference_missing() => {
                tracing::debug!(head_branch, "head ref absent, creating");
            }
            Err(err) => return Err(err),
        }

        let create_err = match self.create_ref(repository, head_branch, commit_sha).await {
            Ok(()) => return Ok(true),
            Err(err) => err,
        };

        // The branch may have been created concurrently after the initial
        // update attempt; one more force-update settles it.
        match self.force_update_ref(repository, head_branch, commit_sha).await {
            Ok(()) => Ok(false),
            Err(retry_err) => Err(GitHubError::RefUpdateConflict {
                create: Box::new(create_err),
                retry: Box::new(retry_err),
            }),
        }
    }

    async fn force_update_ref(
        &self,
        repository: &RepositoryRef,
        head_branch: &str,
        commit_sha: &str,
    ) -> Result<(), GitHubError> {
        let url = self.endpoint(&format!(
            "repos/{}/{}/git/refs/heads/{}",
            repository.owner, repository.name, head_branch
        ))?;
        let _: GitRefResponse = self
            .request_json(
                Method::PATCH,
                format!("force update ref heads/{head_branch}"),
                url,
                Some(&UpdateRefRequest {
                    sha: commit_sha.to_string(),
                    force: true,
                }),
            )
            .await?;
        Ok(())
    }

    async fn create_ref(
        &self,
        repository: &RepositoryRef,
        head_branch: &str,
        commit_sha: &str,
    ) -> Result<(), GitHubError> {
        let url = self.endpoint(&format!(
            "repos/{}/{}/git/refs",
            repository.owner, repository.name
        ))?;
        let _: GitRefResponse = self
            .request_json(
                Method::POST,
                format!("create ref heads/{head_branch}"),
                url,
                Some(&CreateRefRequest {
                    git_ref: format!("refs/heads/{head_branch}"),
                    sha: commit_sha.to_string(),
                }),
            )
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pull request operations
// ---------------------------------------------------------------------------

impl GitHubClient {
    async fn find_open_by_head_inner(
        &self,
        req: &FindPullRequestRequest,
    ) -> Result<Option<PullRequest>, GitHubError> {
        validate_repository_ref(&req.repository)?;
        require(&req.base_branch, "base branch")?;
        require(&req.head_branch, "head branch")?;

        let mut url = self.endpoint(&format!(
            "repos/{}/{}/pulls",
            req.repository.owner, req.repository.name
        ))?;
        url.query_pairs_mut()
            .append_pair("state", "open")
            .append_pair("base", &req.base_branch)
            .append_pair(
                "head",
                &format!("{}:{}", req.repository.owner, req.head_branch),
            )
            .append_pair("per_page", "1");

        let pulls: Vec<PullRequestResponse> = self
            .get_json("list pull requests".to_string(), url)
            .await?;

        Ok(pulls.into_iter().next().map(into_pull_request))
    }

    async fn create_inner(
        &self,
        req: &CreatePullRequestRequest,
    ) -> Result<PullRequest, GitHubError> {
        validate_repository_ref(&req.repository)?;
        require(&req.base_branch, "base branch")?;
        require(&req.head_branch, "head branch")?;
        require(&req.title, "pull request title")?;
        require(&req.body, "pull request body")?;

        let url = self.endpoint(&format!(
            "repos/{}/{}/pulls",
            req.repository.owner, req.repository.name
        ))?;
        let created: PullRequestResponse = self
            .request_json(
                Method::POST,
                "create pull request".to_string(),
                url,
                Some(&CreatePullRequestBody {
                    title: req.title.clone(),
                    head: req.head_branch.clone(),
                    base: req.base_branch.clone(),
                    body: req.body.clone(),
                }),
            )
            .await?;

        Ok(into_pull_request(created))
    }
}

fn into_pull_request(response: PullRequestResponse) -> PullRequest {
    PullRequest {
        number: response.number,
        title: response.title,
        body: response.body.unwrap_or_default(),
        url: response.html_url,
    }
}

// ---------------------------------------------------------------------------
// Port implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl BranchWriter for GitHubClient {
    async fn default_branch(&self, repository: &RepositoryRef) -> Result<String, PortError> {
        Ok(self.default_branch_inner(repository).await?)
    }

    async fn read_file(&self, req: ReadFileRequest) -> Result<ReadFileResult, PortError> {
        Ok(self.read_file_inner(&req).await?)
    }

    async fn upsert_file_and_force_branch(
        &self,
        req: UpsertFileRequest,
    ) -> Result<UpsertFileResult, PortError> {
        Ok(self.upsert_inner(&req).await?)
    }
}

#[async_trait]
impl PullRequestDirectory for GitHubClient {
    async fn find_open_by_head(
        &self,
        req: FindPullRequestRequest,
    ) -> Result<Option<PullRequest>, PortError> {
        Ok(self.find_open_by_head_inner(&req).await?)
    }

    async fn create(&self, req: CreatePullRequestRequest) -> Result<PullRequest, PortError> {
        Ok(self.create_inner(&req).await?)
    }
}
