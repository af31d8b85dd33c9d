use std::path::PathBuf;
use std::time::Duration;

use bundler_core::PageTemplate;
use serde::Deserialize;

use crate::coordinator::{CoordinatorSettings, FailurePolicy};
use crate::export::ExportOptions;
use crate::extract::DEFAULT_CONTENT_SELECTORS;
use crate::fetch::FetchSettings;
use crate::worker::RetryPolicy;

pub const RESULTS_FILE: &str = "results.json";
pub const PROGRESS_FILE: &str = "progress.json";
pub const POSTS_CACHE_FILE: &str = "posts_cache.json";
pub const BLOG_QUEUE_FILE: &str = "blogs.json";

/// Every tunable of a pipeline invocation. Missing fields take their defaults,
/// so a config file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub feed_url: String,
    pub feed_batch_size: usize,
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub checkpoint_every: usize,
    pub page_size: usize,
    pub batch_limit: Option<usize>,
    pub failure_policy: FailurePolicy,
    pub content_selectors: Vec<String>,
    pub state_dir: PathBuf,
    pub output_dir: PathBuf,
    pub page_prefix: String,
    pub site_title: String,
    pub user_agent: String,
    pub max_bytes: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            feed_url: "https://indolawas.blogspot.com/".to_string(),
            feed_batch_size: 500,
            concurrency: 12,
            request_timeout_secs: 20,
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            retries: 1,
            retry_delay_ms: 500,
            checkpoint_every: 50,
            page_size: 500,
            batch_limit: None,
            failure_policy: FailurePolicy::default(),
            content_selectors: DEFAULT_CONTENT_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            state_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            page_prefix: "chord_part".to_string(),
            site_title: PageTemplate::default().site_title,
            user_agent: fetch.user_agent,
            max_bytes: fetch.max_bytes,
        }
    }
}

impl PipelineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            request_timeout: self.request_timeout(),
            max_bytes: self.max_bytes,
            user_agent: self.user_agent.clone(),
            ..FetchSettings::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            concurrency: self.concurrency,
            checkpoint_every: self.checkpoint_every,
            batch_limit: self.batch_limit,
            failure_policy: self.failure_policy,
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            template: PageTemplate {
                site_title: self.site_title.clone(),
                file_prefix: self.page_prefix.clone(),
                ..PageTemplate::default()
            },
            page_size: self.page_size,
            write_index: true,
        }
    }

    pub fn results_path(&self) -> PathBuf {
        self.state_dir.join(RESULTS_FILE)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.state_dir.join(PROGRESS_FILE)
    }

    pub fn posts_cache_path(&self) -> PathBuf {
        self.state_dir.join(POSTS_CACHE_FILE)
    }

    pub fn blog_queue_path(&self) -> PathBuf {
        self.state_dir.join(BLOG_QUEUE_FILE)
    }

    /// Config for one blog of the queue: same tunables, own feed and
    /// `<slug>` subdirectories for state and output.
    pub fn for_collection(&self, slug: &str, feed_url: &str) -> Self {
        Self {
            feed_url: feed_url.to_string(),
            state_dir: self.state_dir.join(slug),
            output_dir: self.output_dir.join(slug),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"page_size": 8, "failure_policy": "retry_next_run"}"#)
                .expect("parse");
        assert_eq!(config.page_size, 8);
        assert_eq!(config.failure_policy, FailurePolicy::RetryNextRun);
        assert_eq!(config.concurrency, 12);
        assert_eq!(config.export_options().template.file_prefix, "chord_part");
    }

    #[test]
    fn collection_config_nests_directories() {
        let base = PipelineConfig {
            state_dir: PathBuf::from("state"),
            output_dir: PathBuf::from("out"),
            ..PipelineConfig::default()
        };
        let blog = base.for_collection("example.com", "https://example.com/");
        assert_eq!(blog.results_path(), PathBuf::from("state/example.com/results.json"));
        assert_eq!(blog.output_dir, PathBuf::from("out/example.com"));
        assert_eq!(blog.feed_url, "https://example.com/");
        assert_eq!(blog.page_size, base.page_size);
    }
}
