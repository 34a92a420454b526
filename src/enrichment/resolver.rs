//! Citation lookups against external bibliographic services.
//!
//! Every resolver is fail-soft: a title with no match, a transport error or a
//! response without a count resolves to [`NOT_FOUND`] instead of an error.
//! Transient failures (timeouts, 429, 5xx) are retried under a [`RetryPolicy`]
//! before settling on the sentinel.

use super::record::NOT_FOUND;
use crate::workspace::{CitationSource, ResolverSettings};
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::{header, StatusCode, Url};
use serde::Deserialize;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Outcome of one lookup; `citations` is `NOT_FOUND` when nothing usable came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub title: String,
    pub citations: i64,
}

impl Resolution {
    pub fn new(title: impl Into<String>, citations: i64) -> Self {
        Self {
            title: title.into(),
            citations,
        }
    }

    pub fn not_found(title: impl Into<String>) -> Self {
        Self::new(title, NOT_FOUND)
    }
}

/// Looks up the citation count of a single title.
///
/// Implementations are called concurrently from pool workers and must not
/// touch the record store.
pub trait CitationResolver: Send + Sync {
    fn resolve(&self, title: &str) -> Resolution;
}

impl<F> CitationResolver for F
where
    F: Fn(&str) -> i64 + Send + Sync,
{
    fn resolve(&self, title: &str) -> Resolution {
        Resolution::new(title, self(title))
    }
}

/// Capped exponential backoff with a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&ResolverSettings::default())
    }
}

impl RetryPolicy {
    /// One attempt, no waiting.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn from_settings(settings: &ResolverSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }

    /// Wait before retry number `retry` (1 = first retry).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    fn run<T>(
        &self,
        title: &str,
        mut op: impl FnMut() -> Result<T, LookupFailure>,
    ) -> Result<T, LookupFailure> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    let wait = self.backoff(attempt);
                    debug!(title, attempt, wait_ms = wait.as_millis() as u64, error = %err, "Retrying citation lookup");
                    thread::sleep(wait);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[derive(Debug, Error)]
enum LookupFailure {
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("HTTP status {0}")]
    Status(StatusCode),
    #[error("unexpected response: {0}")]
    Body(String),
    #[error("invalid endpoint {0}")]
    Endpoint(String),
}

impl LookupFailure {
    fn is_transient(&self) -> bool {
        match self {
            LookupFailure::Transport(_) => true,
            LookupFailure::Status(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            LookupFailure::Body(_) | LookupFailure::Endpoint(_) => false,
        }
    }
}

fn send(request: reqwest::blocking::RequestBuilder) -> Result<reqwest::blocking::Response, LookupFailure> {
    let response = request.send().map_err(LookupFailure::Transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(LookupFailure::Status(status));
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefMessage,
}

#[derive(Debug, Deserialize)]
struct CrossrefMessage {
    #[serde(rename = "total-results", default)]
    total_results: u64,
    #[serde(default)]
    items: Vec<CrossrefWork>,
}

#[derive(Debug, Clone, Deserialize)]
struct CrossrefWork {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "is-referenced-by-count")]
    referenced_by: Option<i64>,
}

/// Title search against the Crossref works endpoint.
#[derive(Debug, Clone)]
struct CrossrefSearch {
    http: Client,
    endpoint: String,
    mailto: Option<String>,
}

impl CrossrefSearch {
    fn top_match(&self, title: &str) -> Result<Option<CrossrefWork>, LookupFailure> {
        let mut params = vec![
            ("query.title", title),
            ("rows", "1"),
            ("query.bibliographic", title),
        ];
        if let Some(mailto) = self.mailto.as_deref() {
            params.push(("mailto", mailto));
        }
        let response = send(self.http.get(&self.endpoint).query(&params))?;
        let body: CrossrefResponse = response
            .json()
            .map_err(|err| LookupFailure::Body(err.to_string()))?;
        if body.message.total_results == 0 {
            return Ok(None);
        }
        Ok(body.message.items.into_iter().next())
    }
}

/// Reads `is-referenced-by-count` of the best Crossref match.
#[derive(Debug, Clone)]
pub struct CrossrefResolver {
    search: CrossrefSearch,
    retry: RetryPolicy,
}

impl CrossrefResolver {
    pub fn new(http: Client, endpoint: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            search: CrossrefSearch {
                http,
                endpoint: endpoint.into(),
                mailto: None,
            },
            retry,
        }
    }

    pub fn with_mailto(mut self, mailto: Option<String>) -> Self {
        self.search.mailto = mailto;
        self
    }
}

impl CitationResolver for CrossrefResolver {
    fn resolve(&self, title: &str) -> Resolution {
        match self.retry.run(title, || self.search.top_match(title)) {
            Ok(Some(work)) => Resolution::new(title, work.referenced_by.unwrap_or(NOT_FOUND)),
            Ok(None) => {
                debug!(title, "No Crossref match");
                Resolution::not_found(title)
            }
            Err(err) => {
                warn!(title, error = %err, "Crossref lookup failed");
                Resolution::not_found(title)
            }
        }
    }
}

/// Finds the DOI through Crossref, then asks OpenCitations for its count.
#[derive(Debug, Clone)]
pub struct OpenCitationsResolver {
    search: CrossrefSearch,
    http: Client,
    endpoint: String,
    access_token: Option<String>,
    retry: RetryPolicy,
}

impl OpenCitationsResolver {
    pub fn new(
        http: Client,
        crossref_endpoint: impl Into<String>,
        endpoint: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            search: CrossrefSearch {
                http: http.clone(),
                endpoint: crossref_endpoint.into(),
                mailto: None,
            },
            http,
            endpoint: endpoint.into(),
            access_token: None,
            retry,
        }
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    pub fn with_mailto(mut self, mailto: Option<String>) -> Self {
        self.search.mailto = mailto;
        self
    }

    fn citation_count(&self, doi: &str) -> Result<i64, LookupFailure> {
        let url = count_url(&self.endpoint, doi)?;
        let mut request = self.http.get(url).header(header::ACCEPT, "application/json");
        if let Some(token) = self.access_token.as_deref() {
            request = request.header(header::AUTHORIZATION, token);
        }
        let body: serde_json::Value = send(request)?
            .json()
            .map_err(|err| LookupFailure::Body(err.to_string()))?;
        let count = &body[0]["count"];
        count
            .as_i64()
            .or_else(|| count.as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or_else(|| LookupFailure::Body(format!("no count in {body}")))
    }
}

/// `<endpoint>/doi:<doi>`, keeping the DOI's own slashes as path separators
/// and percent-encoding everything else a path segment cannot carry.
fn count_url(endpoint: &str, doi: &str) -> Result<Url, LookupFailure> {
    let mut url = Url::parse(endpoint)
        .map_err(|err| LookupFailure::Endpoint(format!("{endpoint}: {err}")))?;
    url.path_segments_mut()
        .map_err(|_| LookupFailure::Endpoint(format!("{endpoint}: cannot carry a path")))?
        .pop_if_empty()
        .extend(format!("doi:{doi}").split('/'));
    Ok(url)
}

impl CitationResolver for OpenCitationsResolver {
    fn resolve(&self, title: &str) -> Resolution {
        let doi = match self.retry.run(title, || self.search.top_match(title)) {
            Ok(Some(CrossrefWork { doi: Some(doi), .. })) => doi,
            Ok(_) => {
                debug!(title, "DOI not found");
                return Resolution::not_found(title);
            }
            Err(err) => {
                warn!(title, error = %err, "DOI lookup failed");
                return Resolution::not_found(title);
            }
        };
        match self.retry.run(title, || self.citation_count(&doi)) {
            Ok(count) => Resolution::new(title, count),
            Err(err) => {
                warn!(title, doi = %doi, error = %err, "OpenCitations lookup failed");
                Resolution::not_found(title)
            }
        }
    }
}

/// Builds the resolver the settings ask for, sharing one HTTP client.
pub fn resolver_from_settings(settings: &ResolverSettings) -> Result<Arc<dyn CitationResolver>> {
    let user_agent = match settings.mailto.as_deref() {
        Some(mailto) => format!("citerank/{} (mailto:{mailto})", env!("CARGO_PKG_VERSION")),
        None => format!("citerank/{}", env!("CARGO_PKG_VERSION")),
    };
    let http = Client::builder()
        .timeout(settings.timeout())
        .user_agent(user_agent)
        .build()
        .context("Failed to build HTTP client for citation lookups")?;
    let retry = RetryPolicy::from_settings(settings);
    let resolver: Arc<dyn CitationResolver> = match settings.source {
        CitationSource::Crossref => Arc::new(
            CrossrefResolver::new(http, settings.crossref_endpoint.clone(), retry)
                .with_mailto(settings.mailto.clone()),
        ),
        CitationSource::Opencitations => Arc::new(
            OpenCitationsResolver::new(
                http,
                settings.crossref_endpoint.clone(),
                settings.opencitations_endpoint.clone(),
                retry,
            )
            .with_access_token(settings.access_token.clone())
            .with_mailto(settings.mailto.clone()),
        ),
    };
    Ok(resolver)
}
