//! Where raw program pages come from.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use curricula_shared::{CurriculaError, Result, SourceConfig};

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!("Curricula/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow per page.
const MAX_REDIRECTS: usize = 5;

/// Supplies the raw HTML of a URL.
pub trait PageSource: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Plain HTTP page source. Waits `settle` after every fetch so that at most
/// one request is in flight and the site is not hammered.
pub struct HttpSource {
    client: Client,
    settle: Duration,
}

impl HttpSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CurriculaError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            settle: Duration::from_millis(config.settle_ms),
        })
    }
}

impl PageSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(url, "fetching page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CurriculaError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CurriculaError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CurriculaError::Network(format!("{url}: body read failed: {e}")))?;

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        debug!(url, bytes = body.len(), "page fetched");
        Ok(body)
    }
}
