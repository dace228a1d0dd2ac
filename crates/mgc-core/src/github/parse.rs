//! Parse API response headers and bodies.

use std::time::Duration;

use serde::Deserialize;

use crate::repository::Repository;

/// Rate limit state, as returned by `GET /rate_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitInfo {
    pub limit: u64,
    pub remaining: u64,
    /// Unix time (seconds) when the window resets.
    pub reset: u64,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    rate: RateLimitInfo,
}

/// Rate limit headers of a single response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RateHeaders {
    pub remaining: Option<u64>,
    pub reset: Option<u64>,
}

impl RateHeaders {
    pub fn exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Time until the window resets plus one second, measured from `now_unix`.
    pub fn wait_from(&self, now_unix: u64) -> Duration {
        let reset = self.reset.unwrap_or(now_unix);
        Duration::from_secs(reset.saturating_sub(now_unix) + 1)
    }
}

/// Last value of header `name` (case-insensitive). Later responses in a
/// redirect chain override earlier ones.
pub(crate) fn header<'a>(lines: &'a [String], name: &str) -> Option<&'a str> {
    lines
        .iter()
        .filter_map(|line| line.split_once(':'))
        .filter(|(n, _)| n.trim().eq_ignore_ascii_case(name))
        .map(|(_, v)| v.trim())
        .last()
}

pub(crate) fn parse_rate_headers(lines: &[String]) -> RateHeaders {
    let num = |name| header(lines, name).and_then(|v| v.parse::<u64>().ok());
    RateHeaders {
        remaining: num("x-ratelimit-remaining"),
        reset: num("x-ratelimit-reset"),
    }
}

pub(crate) fn parse_repositories(body: &[u8]) -> serde_json::Result<Vec<Repository>> {
    serde_json::from_slice(body)
}

pub(crate) fn parse_rate_limit(body: &[u8]) -> serde_json::Result<RateLimitInfo> {
    serde_json::from_slice::<RateLimitResponse>(body).map(|r| r.rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_lookup_is_case_insensitive_and_last_wins() {
        let h = lines(&[
            "HTTP/1.1 301 Moved Permanently",
            "Location: https://api.example.com/x",
            "HTTP/1.1 200 OK",
            "X-RateLimit-Remaining: 59",
            "x-ratelimit-remaining: 58",
        ]);
        assert_eq!(header(&h, "X-RATELIMIT-REMAINING"), Some("58"));
        assert_eq!(header(&h, "etag"), None);
    }

    #[test]
    fn exhausted_rate_limit_waits_until_reset() {
        let h = lines(&[
            "x-ratelimit-remaining: 0",
            "x-ratelimit-reset: 1700000060",
        ]);
        let rate = parse_rate_headers(&h);
        assert!(rate.exhausted());
        assert_eq!(rate.wait_from(1_700_000_000), Duration::from_secs(61));
        assert_eq!(rate.wait_from(1_700_000_100), Duration::from_secs(1));
    }

    #[test]
    fn missing_headers_are_not_exhausted() {
        let rate = parse_rate_headers(&lines(&["content-type: application/json"]));
        assert_eq!(rate, RateHeaders::default());
        assert!(!rate.exhausted());
    }

    #[test]
    fn rate_limit_body() {
        let body = br#"{"resources":{},"rate":{"limit":60,"remaining":12,"reset":1700000000,"used":48}}"#;
        let info = parse_rate_limit(body).unwrap();
        assert_eq!(
            info,
            RateLimitInfo {
                limit: 60,
                remaining: 12,
                reset: 1_700_000_000
            }
        );
    }

    #[test]
    fn repository_page() {
        let body = br#"[
            {"id": 1, "name": "a", "clone_url": "https://example.com/a.git", "fork": true},
            {"id": 2, "name": "b", "clone_url": "https://example.com/b.git", "private": true}
        ]"#;
        let repos = parse_repositories(body).unwrap();
        assert_eq!(repos.len(), 2);
        assert!(repos[0].is_fork);
        assert!(repos[1].is_private);
        assert!(parse_repositories(b"{\"message\":\"Not Found\"}").is_err());
    }
}
