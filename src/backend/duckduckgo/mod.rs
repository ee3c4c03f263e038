mod html;
mod news;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::{BackendError, BackendKind, RawResult, SearchBackend};
use crate::config::BackendConfig;

const SITE_URL: &str = "https://duckduckgo.com";
const HTML_URL: &str = "https://html.duckduckgo.com";

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Browser User-Agents, one picked per request. The HTML vertical serves
/// an empty page to unknown agents.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// DuckDuckGo client covering the news vertical (`news.js`, JSON) and the
/// HTML-only web vertical, which also serves filetype-constrained queries.
#[derive(Clone)]
pub struct DuckDuckGo {
    http: Client,
    region: String,
    timelimit: Option<String>,
    request_timeout: Duration,
    site_url: String,
    html_url: String,
    backoff_ms: u64,
}

impl DuckDuckGo {
    pub fn new(http: Client, config: &BackendConfig) -> Self {
        Self {
            http,
            region: config.region.clone(),
            timelimit: config.timelimit.clone().filter(|t| !t.is_empty()),
            request_timeout: Duration::from_secs(config.timeout_secs),
            site_url: SITE_URL.to_string(),
            html_url: HTML_URL.to_string(),
            backoff_ms: INITIAL_BACKOFF_MS,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            site_url: base_url.to_string(),
            html_url: base_url.to_string(),
            backoff_ms: 1,
            ..Self::new(http, &BackendConfig::default())
        }
    }

    async fn execute_once(
        &self,
        kind: BackendKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RawResult>, BackendError> {
        match kind {
            BackendKind::News => self.news(query, limit).await,
            BackendKind::Text | BackendKind::Filetype => self.web(kind, query, limit).await,
        }
    }

    async fn news(&self, query: &str, limit: usize) -> Result<Vec<RawResult>, BackendError> {
        let vqd = self.vqd(query).await?;

        let mut params = vec![
            ("l", self.region.as_str()),
            ("o", "json"),
            ("noamp", "1"),
            ("q", query),
            ("vqd", vqd.as_str()),
            ("p", "-1"),
        ];
        if let Some(ref df) = self.timelimit {
            params.push(("df", df.as_str()));
        }

        let response = self
            .http
            .get(format!("{}/news.js", self.site_url))
            .query(&params)
            .header("User-Agent", user_agent())
            .header("Referer", format!("{}/", self.site_url))
            .timeout(self.request_timeout)
            .send()
            .await?;
        check_status(response.status())?;

        let text = response.text().await?;
        let body: news::NewsResponse =
            serde_json::from_str(&text).map_err(|e| BackendError::Parse(e.to_string()))?;

        let results = news::to_raw_results(body, limit);
        debug!(count = results.len(), "news results parsed");
        Ok(results)
    }

    /// The news endpoint only answers requests carrying the per-query `vqd`
    /// token embedded in the landing page.
    async fn vqd(&self, query: &str) -> Result<String, BackendError> {
        let response = self
            .http
            .get(&self.site_url)
            .query(&[("q", query)])
            .header("User-Agent", user_agent())
            .timeout(self.request_timeout)
            .send()
            .await?;
        check_status(response.status())?;

        let page = response.text().await?;
        news::extract_vqd(&page).ok_or(BackendError::MissingToken)
    }

    async fn web(
        &self,
        kind: BackendKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RawResult>, BackendError> {
        let mut form = vec![("q", query), ("b", ""), ("kl", self.region.as_str())];
        if let Some(ref df) = self.timelimit {
            form.push(("df", df.as_str()));
        }

        let response = self
            .http
            .post(format!("{}/html/", self.html_url))
            .form(&form)
            .header("User-Agent", user_agent())
            .header("Referer", format!("{}/", self.html_url))
            .timeout(self.request_timeout)
            .send()
            .await?;
        check_status(response.status())?;

        let page = response.text().await?;
        let results = html::parse_results(&page, kind, limit)?;
        debug!(%kind, count = results.len(), "web results parsed");
        Ok(results)
    }
}

impl SearchBackend for DuckDuckGo {
    async fn execute(
        &self,
        kind: BackendKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RawResult>, BackendError> {
        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.execute_once(kind, query, limit).await {
                Ok(results) => return Ok(results),
                Err(e) if is_retriable(&e) => {
                    warn!(%kind, attempt = attempt + 1, error = %e, "transient search error");
                    last_err = Some(e);
                    if attempt + 1 < MAX_ATTEMPTS {
                        let delay_ms = jittered_backoff(self.backoff_ms, attempt);
                        debug!(delay_ms, "retrying after transient error");
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(BackendError::RateLimited))
    }
}

fn check_status(status: StatusCode) -> Result<(), BackendError> {
    match status.as_u16() {
        // DuckDuckGo answers throttled HTML requests with 202 and an empty page.
        202 | 403 | 429 => Err(BackendError::RateLimited),
        200..=299 => Ok(()),
        code => Err(BackendError::Status(code)),
    }
}

fn is_retriable(e: &BackendError) -> bool {
    matches!(
        e,
        BackendError::RateLimited | BackendError::Status(500..=599)
    )
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(initial_ms: u64, attempt: u32) -> u64 {
    let base = initial_ms * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}

fn user_agent() -> &'static str {
    fastrand::choice(USER_AGENTS)
        .copied()
        .unwrap_or(USER_AGENTS[0])
}
