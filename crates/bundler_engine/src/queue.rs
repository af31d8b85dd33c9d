use std::path::{Path, PathBuf};

use bundler_core::{collection_slug, RunStatus, Selection};
use bundler_logging::{bundler_info, bundler_warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::engine::{Pipeline, RunReport};
use crate::persist::{JsonFile, PersistError};
use crate::progress::ProgressSink;
use crate::PipelineError;

/// Blogs waiting for a full per-blog run, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogQueue {
    pub pending: Vec<String>,
    pub done: Vec<String>,
}

impl BlogQueue {
    /// Returns false when the url is already pending or done.
    pub fn enqueue(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        let url = url.trim();
        if url.is_empty() || self.pending.iter().chain(&self.done).any(|u| u == url) {
            return false;
        }
        self.pending.push(url.to_string());
        true
    }

    pub fn peek(&self) -> Option<&str> {
        self.pending.first().map(String::as_str)
    }

    /// Move the head to `done`. Called only once its run has fully completed.
    pub fn commit_head(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let head = self.pending.remove(0);
        self.done.push(head.clone());
        Some(head)
    }
}

pub struct BlogQueueFile {
    file: JsonFile<BlogQueue>,
}

impl BlogQueueFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn load(&self) -> BlogQueue {
        self.file.load_or_default()
    }

    pub fn save(&self, queue: &BlogQueue) -> Result<(), PersistError> {
        self.file.save(queue)?;
        Ok(())
    }

    /// Enqueue and persist; returns how many urls were new.
    pub fn add<I, S>(&self, urls: I) -> Result<usize, PersistError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queue = self.load();
        let mut added = 0;
        for url in urls {
            if queue.enqueue(url) {
                added += 1;
            }
        }
        self.save(&queue)?;
        Ok(added)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedRun {
    pub blog_url: String,
    pub slug: String,
    pub report: RunReport,
    /// The blog left the queue; false when the run stopped early.
    pub committed: bool,
}

/// Run the head of the blog queue to completion under its own state and
/// output subdirectories. The head is popped only after a completed run left
/// nothing remaining, so an interrupted blog, or one whose failed posts were
/// kept out of the store, is resumed next time.
pub async fn run_next_queued(
    config: &PipelineConfig,
    cancel: &CancellationToken,
    sink: &dyn ProgressSink,
) -> Result<Option<QueuedRun>, PipelineError> {
    let queue_file = BlogQueueFile::new(config.blog_queue_path());
    let mut queue = queue_file.load();
    let Some(blog_url) = queue.peek().map(str::to_owned) else {
        bundler_info!("Blog queue {:?} is empty", queue_file.path());
        return Ok(None);
    };

    let slug = collection_slug(&blog_url);
    bundler_info!("Processing queued blog {} into {:?}", blog_url, slug);
    let pipeline = Pipeline::new(config.for_collection(&slug, &blog_url))?;
    let report = pipeline.run(&Selection::All, false, cancel, sink).await?;

    let committed = report.outcome.status == RunStatus::Completed
        && report.outcome.remaining.is_empty();
    if committed {
        queue.commit_head();
        queue_file.save(&queue)?;
        bundler_info!("Blog {} done; {} left in queue", blog_url, queue.pending.len());
    } else {
        bundler_warn!(
            "Blog {} stopped with {:?} and {} posts remaining; it stays at the head of the queue",
            blog_url,
            report.outcome.status,
            report.outcome.remaining.len()
        );
    }

    Ok(Some(QueuedRun {
        blog_url,
        slug,
        report,
        committed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn enqueue_rejects_duplicates_and_done() {
        let mut queue = BlogQueue::default();
        assert!(queue.enqueue("https://a.example/"));
        assert!(!queue.enqueue(" https://a.example/ "));
        assert!(queue.enqueue("https://b.example/"));
        assert_eq!(queue.commit_head().as_deref(), Some("https://a.example/"));
        assert!(!queue.enqueue("https://a.example/"));
        assert_eq!(queue.peek(), Some("https://b.example/"));
    }

    #[test]
    fn commit_on_empty_queue_is_noop() {
        let mut queue = BlogQueue::default();
        assert_eq!(queue.commit_head(), None);
        assert!(queue.done.is_empty());
    }
}
