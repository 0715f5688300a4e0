//! HTTP access for extractors.
//!
//! Extractors never talk to `reqwest` directly; they go through [`Fetcher`]
//! so runs can be exercised against canned responses.

use async_trait::async_trait;
use harvest_core::{Error, Result};
use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::Duration;

/// Browser identities rotated on scraped requests.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:90.0) Gecko/20100101 Firefox/90.0",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchProfile {
    /// Plain API request.
    Api,
    /// Looks like a browser page load, with a rotated user agent.
    Browser,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and return the body. Non-2xx statuses and timeouts are errors.
    async fn fetch(&self, url: &str, profile: FetchProfile) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn random_user_agent() -> &'static str {
        USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0])
    }

    fn browser_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static(Self::random_user_agent()));
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://www.google.com/"));
        headers.insert(header::DNT, HeaderValue::from_static("1"));
        headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, profile: FetchProfile) -> Result<String> {
        let mut request = self.client.get(url);
        if profile == FetchProfile::Browser {
            request = request.headers(Self::browser_headers());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(e).into_extraction())?;
        let response = response
            .error_for_status()
            .map_err(|e| Error::Http(e).into_extraction())?;
        response
            .text()
            .await
            .map_err(|e| Error::Http(e).into_extraction())
    }
}
