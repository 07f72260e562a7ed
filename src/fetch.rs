use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use std::thread;
use std::time::Duration;
use tracing::warn;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: usize = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Blocking page fetcher with a browser identity. One request in flight at
/// a time; transport failures (including timeouts and non-success statuses)
/// are retried a bounded number of times, then surfaced with status and
/// body.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Fetch a URL's document text.
    pub fn get(&self, url: &str) -> Result<String> {
        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.get_once(url) {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!(url, attempt, error = %e, "fetch failed");
                    last_err = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        thread::sleep(RETRY_DELAY);
                    }
                }
            }
        }
        Err(last_err.expect("at least one attempt was made"))
    }

    fn get_once(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!(
                "HTTP {} ({}) fetching {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown"),
                url,
                body
            );
        }

        response
            .text()
            .with_context(|| format!("Failed to read response body from {}", url))
    }
}
