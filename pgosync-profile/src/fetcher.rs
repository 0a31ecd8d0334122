//! HTTP fetcher for pprof CPU profile endpoints.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use pgosync_core::{FetchProfileRequest, PortError, ProfileFetcher};

use crate::error::ProfileError;

/// Applied when no explicit fetch timeout is configured. Must exceed the
/// default 30 s sampling window or every default fetch would time out.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(45);

const PREVIEW_LIMIT: usize = 4 * 1024;

/// Collects CPU profiles from remote pprof HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpProfileFetcher {
    http: reqwest::Client,
}

impl HttpProfileFetcher {
    /// Build a fetcher with the given per-request timeout.
    ///
    /// The timeout covers the whole sampling window: the endpoint only
    /// responds after `seconds` of profiling have elapsed.
    pub fn new(timeout: Duration) -> Result<Self, ProfileError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProfileError::BuildClient)?;
        Ok(Self { http })
    }

    /// Wrap an existing client (tests, custom TLS setups).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn fetch_inner(&self, req: &FetchProfileRequest) -> Result<Vec<u8>, ProfileError> {
        if req.seconds == 0 {
            return Err(ProfileError::NonPositiveSeconds);
        }

        let url = with_profile_seconds(&req.url, req.seconds);

        let mut request = self.http.get(url);
        for (name, value) in &req.headers {
            if name.trim().is_empty() {
                continue;
            }
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let preview = response.text().await.unwrap_or_default();
            let preview = preview.trim();
            let preview = preview.chars().take(PREVIEW_LIMIT).collect::<String>();
            return Err(ProfileError::Status { status, preview });
        }

        let profile = response.bytes().await?;
        if profile.is_empty() {
            return Err(ProfileError::EmptyResponse);
        }

        tracing::debug!(bytes = profile.len(), seconds = req.seconds, "profile sampled");
        Ok(profile.to_vec())
    }
}

#[async_trait]
impl ProfileFetcher for HttpProfileFetcher {
    async fn fetch_cpu_profile(&self, req: FetchProfileRequest) -> Result<Vec<u8>, PortError> {
        Ok(self.fetch_inner(&req).await?)
    }
}

/// Return `url` with its `seconds` query parameter set to the sampling
/// window, replacing any existing value.
fn with_profile_seconds(url: &Url, seconds: u32) -> Url {
    let mut out = url.clone();
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != "seconds")
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    out.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair("seconds", &seconds.to_string());
    out
}
