//! pgosync core library — domain types, collaborator ports, run orchestrator.
//!
//! Public API surface:
//! - [`types`] — request/result structs and normalization defaults
//! - [`error`] — [`RunError`]
//! - [`ports`] — capability traits implemented by adapter crates
//! - [`service`] — [`Service`] and the fetch→validate→compare→write→publish run

pub mod error;
pub mod ports;
pub mod service;
pub mod types;

pub use error::RunError;
pub use ports::{
    BranchWriter, PortError, ProfileFetcher, ProfileValidator, PullRequestDirectory,
};
pub use service::{Dependencies, Service};
pub use types::{
    CommitSettings, CreatePullRequestRequest, FetchProfileRequest, FindPullRequestRequest,
    ProfileSettings, PullRequest, PullRequestSettings, ReadFileRequest, ReadFileResult,
    RepositoryRef, RepositorySettings, RunRequest, RunResult, UpsertFileRequest,
    UpsertFileResult,
};
