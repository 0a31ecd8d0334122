//! # pgosync-github
//!
//! GitHub REST adapter for the pgosync branch-writer and pull-request
//! directory ports. Publishes profile updates through the git object
//! model: blob → tree → commit → ref, then manages the automation pull
//! request for the head branch.

pub mod api;
pub mod client;
pub mod error;

pub use client::{GitHubClient, GitHubClientOptions};
pub use error::GitHubError;
