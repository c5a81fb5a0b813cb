// src/github/client.rs
// =============================================================================
// Authenticated, rate-limited access to the GitHub REST API.
//
// Three entry points:
// - request(): build an authenticated request. A non-empty query string marks
//   it as a *search* call; GitHub meters search separately, so search calls
//   skip the quota gate and don't touch the core quota numbers.
// - do_json(): send, check status, decode the JSON body into T
// - do_raw():  send, check status, return the body as text (manifests, READMEs)
//
// Errors are reported to the caller and never poison the client: the crawler
// decides whether to skip the item or carry on.
// =============================================================================

use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::rate_limit::{quota_from_headers, RateLimiter};
use crate::error::ApiError;

pub const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";
pub const HTML_MEDIA_TYPE: &str = "application/vnd.github.v3.html";

const USER_AGENT: &str = concat!("modgraph/", env!("CARGO_PKG_VERSION"));

// A built request plus whether it counts against the search quota
#[derive(Debug)]
pub struct ApiRequest {
    inner: reqwest::Request,
    search: bool,
}

impl ApiRequest {
    #[cfg(test)]
    pub fn is_search(&self) -> bool {
        self.search
    }

    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    /// Overrides the Accept header (raw file or rendered HTML).
    pub fn accept(mut self, media_type: &'static str) -> Self {
        self.inner
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static(media_type));
        self
    }
}

pub struct GitHubClient {
    http: Client,
    base_url: Url,
    token: String,
    limiter: RateLimiter,
    requests: AtomicU64,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ApiError> {
        Self::with_builder(base_url, token, Client::builder())
    }

    fn with_builder(base_url: &str, token: &str, builder: ClientBuilder) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("bad API url '{}': {}", base_url, e)))?;

        let http = builder
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("cannot build HTTP client: {}", e)))?;

        Ok(GitHubClient {
            http,
            base_url,
            token: token.to_string(),
            limiter: RateLimiter::default(),
            requests: AtomicU64::new(0),
        })
    }

    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    // Builds an authenticated request for `path` relative to the API base
    pub fn request(&self, method: Method, path: &str, query: &str) -> Result<ApiRequest, ApiError> {
        let url = self.resolve(path, query)?;
        let search = !query.is_empty();

        let inner = self
            .http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        Ok(ApiRequest { inner, search })
    }

    pub async fn do_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let url = request.url().to_string();
        let response = self.execute(request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ApiError::Network {
                url: url.clone(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { url, source })
    }

    pub async fn do_raw(&self, request: ApiRequest) -> Result<String, ApiError> {
        let url = request.url().to_string();
        let response = self.execute(request).await?;
        response
            .text()
            .await
            .map_err(|source| ApiError::Network { url, source })
    }

    /// Total requests sent by this client. Observability only.
    pub fn requests_made(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    async fn execute(&self, request: ApiRequest) -> Result<reqwest::Response, ApiError> {
        let ApiRequest { inner, search } = request;
        let url = inner.url().to_string();

        if !search {
            self.limiter.acquire().await;
        }

        let response = self
            .http
            .execute(inner)
            .await
            .map_err(|source| ApiError::Network {
                url: url.clone(),
                source,
            })?;
        let count = self.requests.fetch_add(1, Ordering::Relaxed) + 1;

        if !search {
            let quota = quota_from_headers(response.headers());
            debug!(
                request = count,
                remaining = quota.remaining,
                reset = quota.reset_at,
                %url,
                "core request"
            );
            self.limiter.record(quota).await;
        } else {
            debug!(request = count, %url, "search request");
        }

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(classify_status(status, url))
        }
    }

    fn resolve(&self, path: &str, query: &str) -> Result<Url, ApiError> {
        // Join by string so a base with a path prefix (GitHub Enterprise's
        // /api/v3) keeps it
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{}/{}", base, path))
            .map_err(|e| ApiError::InvalidRequest(format!("bad path '{}': {}", path, e)))?;
        if !query.is_empty() {
            url.set_query(Some(query));
        }
        Ok(url)
    }
}

fn classify_status(status: StatusCode, url: String) -> ApiError {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => ApiError::NotFound(url),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Denied { status, url },
        _ => ApiError::Status { status, url },
    }
}
