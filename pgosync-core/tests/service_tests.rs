//! Orchestrator behavior with mock ports.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use pgosync_core::{
    BranchWriter, CommitSettings, CreatePullRequestRequest, Dependencies, FetchProfileRequest,
    FindPullRequestRequest, PortError, ProfileFetcher, ProfileSettings, ProfileValidator,
    PullRequest, PullRequestDirectory, PullRequestSettings, ReadFileRequest, ReadFileResult,
    RepositoryRef, RepositorySettings, RunError, RunRequest, Service, UpsertFileRequest,
    UpsertFileResult,
};

const MARKER: &str = "<!-- managed-by:pgosync -->";

// ---------------------------------------------------------------------------
// Mock ports
// ---------------------------------------------------------------------------

struct StaticFetcher {
    payload: Vec<u8>,
}

#[async_trait]
impl ProfileFetcher for StaticFetcher {
    async fn fetch_cpu_profile(&self, _req: FetchProfileRequest) -> Result<Vec<u8>, PortError> {
        Ok(self.payload.clone())
    }
}

struct AcceptAllValidator;

impl ProfileValidator for AcceptAllValidator {
    fn validate_cpu_profile(&self, _raw: &[u8]) -> Result<(), PortError> {
        Ok(())
    }
}

struct RejectingValidator;

impl ProfileValidator for RejectingValidator {
    fn validate_cpu_profile(&self, _raw: &[u8]) -> Result<(), PortError> {
        Err("cpu profile has no samples".into())
    }
}

#[derive(Default)]
struct MockWriter {
    default_branch: String,
    artifact: Option<Vec<u8>>,
    upserts: Mutex<Vec<UpsertFileRequest>>,
}

#[async_trait]
impl BranchWriter for MockWriter {
    async fn default_branch(&self, _repository: &RepositoryRef) -> Result<String, PortError> {
        Ok(self.default_branch.clone())
    }

    async fn read_file(&self, _req: ReadFileRequest) -> Result<ReadFileResult, PortError> {
        match &self.artifact {
            Some(content) => Ok(ReadFileResult {
                content: content.clone(),
                exists: true,
            }),
            None => Ok(ReadFileResult::default()),
        }
    }

    async fn upsert_file_and_force_branch(
        &self,
        req: UpsertFileRequest,
    ) -> Result<UpsertFileResult, PortError> {
        self.upserts.lock().unwrap().push(req);
        Ok(UpsertFileResult {
            commit_sha: "c0ffee".to_string(),
            branch_created: true,
        })
    }
}

#[derive(Default)]
struct MockDirectory {
    open: Option<PullRequest>,
    created: Mutex<Vec<CreatePullRequestRequest>>,
}

#[async_trait]
impl PullRequestDirectory for MockDirectory {
    async fn find_open_by_head(
        &self,
        _req: FindPullRequestRequest,
    ) -> Result<Option<PullRequest>, PortError> {
        Ok(self.open.clone())
    }

    async fn create(&self, req: CreatePullRequestRequest) -> Result<PullRequest, PortError> {
        self.created.lock().unwrap().push(req.clone());
        Ok(PullRequest {
            number: 42,
            title: req.title,
            body: req.body,
            url: "https://github.test/acme/api/pull/42".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn request() -> RunRequest {
    RunRequest {
        profile: ProfileSettings {
            url: Url::parse("http://svc.internal:6060/debug/pprof/profile").unwrap(),
            seconds: 5,
            headers: HashMap::new(),
        },
        repository: RepositorySettings {
            owner: "acme".to_string(),
            name: "api".to_string(),
            artifact_path: "default.pgo".to_string(),
            base_branch: String::new(),
            head_branch: "pgosync".to_string(),
        },
        pull_request: PullRequestSettings {
            title: "perf(pgo): refresh pgo profile".to_string(),
            body: "Automated PGO profile refresh.".to_string(),
            managed_by_marker: MARKER.to_string(),
        },
        commit: CommitSettings {
            message: "perf(pgo): refresh pgo profile".to_string(),
        },
    }
}

fn managed_pr(number: u64) -> PullRequest {
    PullRequest {
        number,
        title: "perf(pgo): refresh pgo profile".to_string(),
        body: format!("Automated PGO profile refresh.\n\n{MARKER}"),
        url: format!("https://github.test/acme/api/pull/{number}"),
    }
}

struct Harness {
    service: Service,
    writer: Arc<MockWriter>,
    directory: Arc<MockDirectory>,
}

fn harness(profile: &[u8], writer: MockWriter, directory: MockDirectory) -> Harness {
    let writer = Arc::new(writer);
    let directory = Arc::new(directory);
    let service = Service::new(Dependencies {
        profile_fetcher: Arc::new(StaticFetcher {
            payload: profile.to_vec(),
        }),
        profile_validator: Arc::new(AcceptAllValidator),
        branch_writer: writer.clone(),
        pull_requests: directory.clone(),
    });
    Harness {
        service,
        writer,
        directory,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unchanged_artifact_is_a_noop() {
    let h = harness(
        b"profile-bytes",
        MockWriter {
            default_branch: "main".to_string(),
            artifact: Some(b"profile-bytes".to_vec()),
            ..MockWriter::default()
        },
        MockDirectory::default(),
    );

    let result = h.service.run(request()).await.expect("run");

    assert!(result.noop);
    assert!(!result.profile_changed);
    assert!(!result.pull_request_created);
    assert_eq!(result.base_branch, "main");
    assert_eq!(result.pull_request_number, None);
    assert!(result.commit_sha.is_none());
    assert!(h.writer.upserts.lock().unwrap().is_empty());
    assert!(h.directory.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn noop_reuses_existing_managed_pr_number() {
    let h = harness(
        b"profile-bytes",
        MockWriter {
            default_branch: "main".to_string(),
            artifact: Some(b"profile-bytes".to_vec()),
            ..MockWriter::default()
        },
        MockDirectory {
            open: Some(managed_pr(17)),
            ..MockDirectory::default()
        },
    );

    let result = h.service.run(request()).await.expect("run");

    assert!(result.noop);
    assert_eq!(result.pull_request_number, Some(17));
    assert!(h.writer.upserts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unmanaged_pull_request_blocks_the_run() {
    let h = harness(
        b"new-profile",
        MockWriter {
            default_branch: "main".to_string(),
            artifact: Some(b"old-profile".to_vec()),
            ..MockWriter::default()
        },
        MockDirectory {
            open: Some(PullRequest {
                number: 9,
                title: "my manual work".to_string(),
                body: "hand-written branch, do not touch".to_string(),
                url: "https://github.test/acme/api/pull/9".to_string(),
            }),
            ..MockDirectory::default()
        },
    );

    let err = h.service.run(request()).await.expect_err("should fail");

    assert!(matches!(
        err,
        RunError::UnmanagedPullRequest { number: 9, .. }
    ));
    assert!(h.writer.upserts.lock().unwrap().is_empty());
    assert!(h.directory.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn managed_pr_is_reused_without_creating_a_new_one() {
    let h = harness(
        b"new-profile",
        MockWriter {
            default_branch: "main".to_string(),
            artifact: Some(b"old-profile".to_vec()),
            ..MockWriter::default()
        },
        MockDirectory {
            open: Some(managed_pr(17)),
            ..MockDirectory::default()
        },
    );

    let result = h.service.run(request()).await.expect("run");

    assert!(result.profile_changed);
    assert!(!result.pull_request_created);
    assert!(!result.noop);
    assert_eq!(result.pull_request_number, Some(17));
    assert_eq!(result.commit_sha.as_deref(), Some("c0ffee"));
    assert_eq!(h.writer.upserts.lock().unwrap().len(), 1);
    assert!(h.directory.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn changed_artifact_creates_a_marked_pull_request() {
    let h = harness(
        b"new-profile",
        MockWriter {
            default_branch: "main".to_string(),
            artifact: Some(b"old-profile".to_vec()),
            ..MockWriter::default()
        },
        MockDirectory::default(),
    );

    let result = h.service.run(request()).await.expect("run");

    assert!(result.profile_changed);
    assert!(result.pull_request_created);
    assert_eq!(result.pull_request_number, Some(42));

    let created = h.directory.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].body.matches(MARKER).count(), 1);
    assert!(created[0].body.starts_with("Automated PGO profile refresh."));

    let upserts = h.writer.upserts.lock().unwrap();
    assert_eq!(upserts.len(), 1);
    assert_eq!(upserts[0].path, "default.pgo");
    assert_eq!(upserts[0].content, b"new-profile");
    assert_eq!(upserts[0].base_branch, "main");
    assert_eq!(upserts[0].head_branch, "pgosync");
}

#[tokio::test]
async fn missing_artifact_still_writes() {
    let h = harness(
        b"new-profile",
        MockWriter {
            default_branch: "main".to_string(),
            artifact: None,
            ..MockWriter::default()
        },
        MockDirectory::default(),
    );

    let result = h.service.run(request()).await.expect("run");

    assert!(result.profile_changed);
    assert!(!result.noop);
    assert_eq!(h.writer.upserts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn configured_base_branch_skips_default_lookup() {
    let mut req = request();
    req.repository.base_branch = "release".to_string();

    // A writer whose default branch is blank would fail resolution; the
    // configured base branch must make that path unreachable.
    let h = harness(
        b"new-profile",
        MockWriter {
            default_branch: String::new(),
            artifact: None,
            ..MockWriter::default()
        },
        MockDirectory::default(),
    );

    let result = h.service.run(req).await.expect("run");
    assert_eq!(result.base_branch, "release");
}

#[tokio::test]
async fn blank_default_branch_fails_resolution() {
    let h = harness(
        b"new-profile",
        MockWriter {
            default_branch: "  ".to_string(),
            artifact: None,
            ..MockWriter::default()
        },
        MockDirectory::default(),
    );

    let err = h.service.run(request()).await.expect_err("should fail");
    assert!(matches!(err, RunError::EmptyDefaultBranch));
}

#[tokio::test]
async fn invalid_profile_aborts_before_any_repository_call() {
    let writer = Arc::new(MockWriter {
        default_branch: "main".to_string(),
        artifact: Some(b"old".to_vec()),
        ..MockWriter::default()
    });
    let directory = Arc::new(MockDirectory::default());
    let service = Service::new(Dependencies {
        profile_fetcher: Arc::new(StaticFetcher {
            payload: b"garbage".to_vec(),
        }),
        profile_validator: Arc::new(RejectingValidator),
        branch_writer: writer.clone(),
        pull_requests: directory.clone(),
    });

    let err = service.run(request()).await.expect_err("should fail");

    assert!(matches!(err, RunError::InvalidProfile(_)));
    assert!(writer.upserts.lock().unwrap().is_empty());
    assert!(directory.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn blank_owner_is_rejected_before_fetching() {
    let mut req = request();
    req.repository.owner = String::new();

    let h = harness(b"p", MockWriter::default(), MockDirectory::default());
    let err = h.service.run(req).await.expect_err("should fail");
    assert!(matches!(err, RunError::InvalidRequest(_)));
}

#[tokio::test]
async fn example_scenario_old_to_new() {
    // Base branch carries default.pgo = "old"; the sampled profile is
    // "new"; no open PR exists for the branch pair.
    let h = harness(
        b"new",
        MockWriter {
            default_branch: "main".to_string(),
            artifact: Some(b"old".to_vec()),
            ..MockWriter::default()
        },
        MockDirectory::default(),
    );

    let result = h.service.run(request()).await.expect("run");

    assert!(result.profile_changed);
    assert!(result.pull_request_created);
    assert!(result.commit_sha.is_some());
    assert_eq!(result.head_branch, "pgosync");
}
