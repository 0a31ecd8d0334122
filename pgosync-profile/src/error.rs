//! Error types for pgosync-profile.

use thiserror::Error;

/// All errors that can arise from profile collection and validation.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The fetcher's HTTP client could not be constructed.
    #[error("build profile http client: {0}")]
    BuildClient(#[source] reqwest::Error),

    /// The sampling window must be positive.
    #[error("profile seconds must be positive")]
    NonPositiveSeconds,

    /// Transport-level fetch failure.
    #[error("fetch profile: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-200 response from the profile endpoint, with a bounded body
    /// preview for diagnosis.
    #[error("fetch profile: unexpected status {status}: {preview}")]
    Status {
        status: reqwest::StatusCode,
        preview: String,
    },

    /// The endpoint answered 200 with an empty body.
    #[error("profile response is empty")]
    EmptyResponse,

    /// Validation input was empty.
    #[error("cpu profile is empty")]
    EmptyProfile,

    /// The payload looked gzip-compressed but could not be decompressed.
    #[error("decompress cpu profile: {0}")]
    Gunzip(#[source] std::io::Error),

    /// The payload is not a well-formed pprof protobuf message.
    #[error("parse cpu profile: {0}")]
    Parse(String),

    /// Structurally valid profile with zero recorded samples.
    #[error("cpu profile has no samples")]
    NoSamples,
}
