use std::sync::Arc;
use std::time::Duration;

use bundler_core::{render_failure, render_post, Snippet, SourceItem};
use bundler_logging::{bundler_debug, bundler_warn};

use crate::decode::decode_html;
use crate::extract::Extractor;
use crate::fetch::Fetcher;
use crate::{FailureKind, FetchError, FetchOutput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one, transient failures only.
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            delay: Duration::from_millis(500),
        }
    }
}

/// Turns one [`SourceItem`] into a [`Snippet`]. Has no access to the store.
pub struct FetchWorker {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl FetchWorker {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            timeout,
            retry,
        }
    }

    /// Never fails: any error becomes a placeholder snippet carrying the message.
    pub async fn fetch(&self, item: &SourceItem) -> Snippet {
        match self.fetch_content(item).await {
            Ok(snippet) => snippet,
            Err(err) => {
                bundler_warn!("Fetch failed for {}: {}", item.url, err);
                render_failure(&item.title, &item.url, &err.to_string())
            }
        }
    }

    pub async fn fetch_content(&self, item: &SourceItem) -> Result<Snippet, FetchError> {
        let output = self.fetch_with_retry(&item.url).await?;
        let meta = &output.metadata;
        if meta.final_url != meta.original_url {
            bundler_debug!("{} redirected to {}", meta.original_url, meta.final_url);
        }
        bundler_debug!("Fetched {} bytes from {}", meta.byte_len, meta.final_url);
        let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref());
        if decoded.had_errors {
            bundler_debug!(
                "Lossy decode of {} as {}",
                item.url,
                decoded.encoding_label
            );
        }
        let extracted = self.extractor.extract(&decoded.html);
        let title = if item.title.trim().is_empty() {
            extracted.title.as_deref().unwrap_or_default()
        } else {
            item.title.as_str()
        };
        Ok(render_post(title, &item.url, &extracted.content_html))
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, self.fetcher.fetch(url)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::new(
                    FailureKind::Timeout,
                    format!("no response within {:?}", self.timeout),
                )),
            };
            match result {
                Err(err) if err.is_transient() && attempt < self.retry.retries => {
                    attempt += 1;
                    bundler_debug!("Retrying {} (attempt {}) after: {}", url, attempt + 1, err);
                    tokio::time::sleep(self.retry.delay).await;
                }
                other => return other,
            }
        }
    }
}
