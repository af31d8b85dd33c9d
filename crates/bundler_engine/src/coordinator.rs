use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use bundler_core::{
    render_failure, ContentStore, ProgressEvent, RunOutcome, RunStatus, Snippet, SourceItem,
};
use bundler_logging::{bundler_error, bundler_info};
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::persist::{CheckpointFile, ContentStoreFile, PersistError};
use crate::progress::ProgressSink;
use crate::worker::FetchWorker;
use crate::PipelineError;

/// What happens to a url whose fetch ended in a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Store the placeholder; the url is never retried.
    #[default]
    CachePlaceholder,
    /// Leave the url out of the store so the next run tries again.
    RetryNextRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub concurrency: usize,
    pub checkpoint_every: usize,
    /// Maximum fetches dispatched per invocation; `None` is unbounded.
    pub batch_limit: Option<usize>,
    pub failure_policy: FailurePolicy,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            concurrency: 12,
            checkpoint_every: 50,
            batch_limit: None,
            failure_policy: FailurePolicy::CachePlaceholder,
        }
    }
}

/// Drains pending items through a bounded set of fetch workers.
///
/// The coordinator is the single writer of the content store and checkpoint
/// files; workers only return snippets. Cancellation is polled before each
/// dispatch and in-flight fetches are always allowed to finish.
pub struct Coordinator {
    worker: Arc<FetchWorker>,
    store_file: ContentStoreFile,
    checkpoint_file: CheckpointFile,
    settings: CoordinatorSettings,
}

impl Coordinator {
    pub fn new(
        worker: Arc<FetchWorker>,
        store_file: ContentStoreFile,
        checkpoint_file: CheckpointFile,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            worker,
            store_file,
            checkpoint_file,
            settings,
        }
    }

    pub async fn run(
        &self,
        selection: &[SourceItem],
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<RunOutcome, PipelineError> {
        let mut store = self.store_file.load();
        let checkpoint = self.checkpoint_file.record(selection, &store)?;
        let total = selection.len();
        let already_cached = checkpoint.completed.len();

        let mut seen = HashSet::new();
        let mut pending: VecDeque<SourceItem> = selection
            .iter()
            .filter(|item| !store.contains(&item.url) && seen.insert(item.url.clone()))
            .cloned()
            .collect();

        bundler_info!(
            "Selection of {} items: {} cached, {} to fetch",
            total,
            already_cached,
            pending.len()
        );
        sink.emit(ProgressEvent::Started {
            total,
            already_cached,
            pending: pending.len(),
        });

        if pending.is_empty() {
            sink.emit(ProgressEvent::Finished {
                status: RunStatus::Completed,
                completed: already_cached,
                total,
            });
            return Ok(RunOutcome {
                status: RunStatus::Completed,
                total,
                already_cached,
                fetched: 0,
                failed: 0,
                remaining: Vec::new(),
            });
        }

        let concurrency = self.settings.concurrency.max(1);
        let checkpoint_every = self.settings.checkpoint_every.max(1);
        let mut budget = self.settings.batch_limit.unwrap_or(usize::MAX);
        let mut in_flight = FuturesUnordered::new();
        let mut unsaved: Vec<(String, String)> = Vec::new();
        let mut completed = already_cached;
        let mut fetched = 0;
        let mut failed = 0;
        let mut since_checkpoint = 0;
        let mut cancelled = false;

        loop {
            while in_flight.len() < concurrency && budget > 0 && !pending.is_empty() {
                if cancel.is_cancelled() {
                    if !cancelled {
                        bundler_info!("Cancellation requested; draining in-flight fetches");
                        sink.emit(ProgressEvent::CancelRequested);
                    }
                    cancelled = true;
                    break;
                }
                let Some(item) = pending.pop_front() else {
                    break;
                };
                budget -= 1;
                in_flight.push(self.dispatch(item));
            }

            let Some((item, snippet)) = in_flight.next().await else {
                break;
            };

            fetched += 1;
            completed += 1;
            let placeholder = snippet.is_placeholder();
            if placeholder {
                failed += 1;
            }
            if !placeholder || self.settings.failure_policy == FailurePolicy::CachePlaceholder {
                unsaved.push((item.url.clone(), snippet.html));
            }
            sink.emit(ProgressEvent::Fetched {
                url: item.url,
                title: item.title,
                completed,
                total,
                placeholder,
            });

            since_checkpoint += 1;
            if since_checkpoint >= checkpoint_every {
                self.persist(selection, &mut store, &mut unsaved)?;
                since_checkpoint = 0;
                sink.emit(ProgressEvent::Checkpointed { completed, total });
            }
        }

        let checkpoint = self.persist(selection, &mut store, &mut unsaved)?;
        sink.emit(ProgressEvent::Checkpointed { completed, total });

        let status = if cancelled {
            RunStatus::Cancelled
        } else if pending.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::BatchLimited
        };
        bundler_info!(
            "Run finished: {:?}, fetched {} ({} failed), {} remaining",
            status,
            fetched,
            failed,
            checkpoint.remaining().len()
        );
        sink.emit(ProgressEvent::Finished {
            status,
            completed: checkpoint.completed.len(),
            total,
        });

        Ok(RunOutcome {
            status,
            total,
            already_cached,
            fetched,
            failed,
            remaining: checkpoint.remaining(),
        })
    }

    fn dispatch(
        &self,
        item: SourceItem,
    ) -> impl std::future::Future<Output = (SourceItem, Snippet)> {
        let worker = self.worker.clone();
        let task_item = item.clone();
        let handle = tokio::spawn(async move { worker.fetch(&task_item).await });
        async move {
            match handle.await {
                Ok(snippet) => (item, snippet),
                Err(err) => {
                    bundler_error!("Fetch task for {} aborted: {}", item.url, err);
                    let snippet = render_failure(&item.title, &item.url, &err.to_string());
                    (item, snippet)
                }
            }
        }
    }

    fn persist(
        &self,
        selection: &[SourceItem],
        store: &mut ContentStore,
        unsaved: &mut Vec<(String, String)>,
    ) -> Result<bundler_core::Checkpoint, PersistError> {
        self.store_file.put_all(store, unsaved.drain(..))?;
        self.checkpoint_file.record(selection, store)
    }
}
