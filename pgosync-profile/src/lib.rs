//! # pgosync-profile
//!
//! CPU profile collection and validation for pgosync: an HTTP fetcher for
//! pprof endpoints and a structural validator that rejects payloads
//! without recorded samples.

pub mod error;
pub mod fetcher;
pub mod validator;

pub use error::ProfileError;
pub use fetcher::HttpProfileFetcher;
pub use validator::PprofValidator;
