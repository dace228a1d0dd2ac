//! Repository listing through the GitHub REST API.
//!
//! Uses the curl crate (libcurl). Every call blocks the current thread; call
//! from `spawn_blocking` when used from async code.

mod parse;

use std::str;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use url::Url;

use crate::config::MgcConfig;
use crate::repository::Repository;

pub use parse::RateLimitInfo;

/// Longest single pause for an exhausted rate limit.
pub const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("API base URL cannot carry a path: {0}")]
    BaseUrl(String),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: curl::Error,
    },

    #[error("GitHub API error: {url} returned HTTP {status}")]
    Status { url: String, status: u32 },

    #[error("rate limit still exceeded for {url}")]
    RateLimited { url: String },

    #[error("invalid JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One finished HTTP exchange.
#[derive(Debug)]
struct Response {
    status: u32,
    headers: Vec<String>,
    body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct GithubClient {
    base: Url,
    token: Option<String>,
    timeout: Duration,
    per_page: u32,
    max_rate_wait: Duration,
}

impl GithubClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ApiError::BaseUrl(base_url.to_string()));
        }
        Ok(Self {
            base,
            token: token.filter(|t| !t.is_empty()),
            timeout,
            per_page: 100,
            max_rate_wait: MAX_RATE_LIMIT_WAIT,
        })
    }

    pub fn from_config(cfg: &MgcConfig) -> Result<Self, ApiError> {
        Ok(Self::new(&cfg.api_base_url, cfg.token.clone(), cfg.api_timeout())?
            .with_per_page(cfg.per_page))
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, 100);
        self
    }

    pub fn with_max_rate_wait(mut self, max: Duration) -> Self {
        self.max_rate_wait = max;
        self
    }

    /// True for 200, false for 404. Any other status is an error.
    pub fn account_exists(&self, account: &str) -> Result<bool, ApiError> {
        let url = self.endpoint(&["users", account])?;
        let resp = self.get(&url)?;
        match resp.status {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(ApiError::Status {
                url: url.to_string(),
                status,
            }),
        }
    }

    /// All repositories of `account`, most recently updated first.
    /// Pages are fetched until one comes back shorter than `per_page`.
    pub fn list_repositories(&self, account: &str) -> Result<Vec<Repository>, ApiError> {
        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            let mut url = self.endpoint(&["users", account, "repos"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &self.per_page.to_string())
                .append_pair("page", &page.to_string())
                .append_pair("sort", "updated");

            let resp = self.get(&url)?;
            let batch = self.expect_ok(&url, resp, parse::parse_repositories)?;
            let count = batch.len();
            tracing::debug!(account, page, count, "fetched repository page");
            all.extend(batch);

            if count < self.per_page as usize {
                break;
            }
            page += 1;
        }
        tracing::info!(account, total = all.len(), "listed repositories");
        Ok(all)
    }

    pub fn rate_limit(&self) -> Result<RateLimitInfo, ApiError> {
        let url = self.endpoint(&["rate_limit"])?;
        let resp = self.perform(&url)?;
        self.expect_ok(&url, resp, parse::parse_rate_limit)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::BaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn expect_ok<T>(
        &self,
        url: &Url,
        resp: Response,
        parse: impl FnOnce(&[u8]) -> serde_json::Result<T>,
    ) -> Result<T, ApiError> {
        if resp.status != 200 {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: resp.status,
            });
        }
        parse(&resp.body).map_err(|source| ApiError::Json {
            url: url.to_string(),
            source,
        })
    }

    /// GET with a single wait-and-retry when the rate limit is exhausted.
    fn get(&self, url: &Url) -> Result<Response, ApiError> {
        let resp = self.perform(url)?;
        if !is_rate_limited(&resp) {
            return Ok(resp);
        }

        let rate = parse::parse_rate_headers(&resp.headers);
        let wait = rate.wait_from(unix_now()).min(self.max_rate_wait);
        tracing::warn!(
            url = %url,
            wait_secs = wait.as_secs(),
            "rate limit exceeded; waiting for reset"
        );
        std::thread::sleep(wait);

        let resp = self.perform(url)?;
        if is_rate_limited(&resp) {
            return Err(ApiError::RateLimited {
                url: url.to_string(),
            });
        }
        Ok(resp)
    }

    fn perform(&self, url: &Url) -> Result<Response, ApiError> {
        let transport = |source| ApiError::Transport {
            url: url.to_string(),
            source,
        };

        let mut headers: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str()).map_err(transport)?;
        easy.follow_location(true).map_err(transport)?;
        easy.connect_timeout(self.timeout.min(Duration::from_secs(15)))
            .map_err(transport)?;
        easy.timeout(self.timeout).map_err(transport)?;
        easy.useragent(&format!("mgc/{}", env!("CARGO_PKG_VERSION")))
            .map_err(transport)?;

        let mut list = curl::easy::List::new();
        list.append("Accept: application/vnd.github.v3+json")
            .map_err(transport)?;
        if let Some(token) = &self.token {
            list.append(&format!("Authorization: token {}", token))
                .map_err(transport)?;
        }
        easy.http_headers(list).map_err(transport)?;

        {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Ok(s) = str::from_utf8(data) {
                        headers.push(s.trim_end().to_string());
                    }
                    true
                })
                .map_err(transport)?;
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(transport)?;
            transfer.perform().map_err(transport)?;
        }

        let status = easy.response_code().map_err(transport)?;
        tracing::debug!(url = %url, status, bytes = body.len(), "API request");
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

fn is_rate_limited(resp: &Response) -> bool {
    matches!(resp.status, 403 | 429) && parse::parse_rate_headers(&resp.headers).exhausted()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> GithubClient {
        GithubClient::new(base, None, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn endpoints_escape_account_names() {
        let c = client("https://api.github.com");
        assert_eq!(
            c.endpoint(&["users", "octo cat", "repos"]).unwrap().as_str(),
            "https://api.github.com/users/octo%20cat/repos"
        );
    }

    #[test]
    fn endpoints_keep_base_path() {
        let c = client("http://127.0.0.1:8080/api/v3/");
        assert_eq!(
            c.endpoint(&["rate_limit"]).unwrap().as_str(),
            "http://127.0.0.1:8080/api/v3/rate_limit"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(matches!(
            GithubClient::new("mailto:someone@example.com", None, Duration::from_secs(1)),
            Err(ApiError::BaseUrl(_))
        ));
        assert!(matches!(
            GithubClient::new("not a url", None, Duration::from_secs(1)),
            Err(ApiError::Url(_))
        ));
    }

    #[test]
    fn per_page_is_clamped() {
        assert_eq!(client("https://x.test").with_per_page(0).per_page, 1);
        assert_eq!(client("https://x.test").with_per_page(500).per_page, 100);
    }

    #[test]
    fn empty_token_is_dropped() {
        let c = GithubClient::new("https://x.test", Some(String::new()), Duration::from_secs(1))
            .unwrap();
        assert!(c.token.is_none());
    }
}
