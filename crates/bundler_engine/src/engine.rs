use std::sync::Arc;

use bundler_core::{Checkpoint, ProgressEvent, RunOutcome, Selection, SourceItem};
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::coordinator::Coordinator;
use crate::export::{export_pages, ExportSummary};
use crate::extract::SelectorExtractor;
use crate::fetch::{Fetcher, ReqwestFetcher};
use crate::listing::{CachedLister, FeedLister, ListError, SourceLister};
use crate::persist::{CheckpointFile, ContentStoreFile, JsonFile};
use crate::progress::ProgressSink;
use crate::worker::FetchWorker;
use crate::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub export: ExportSummary,
}

/// List, fetch and export for one collection, wired from a [`PipelineConfig`].
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Arc<dyn Fetcher>,
    lister: Arc<dyn SourceLister>,
}

impl Pipeline {
    /// Default adapters: one pooled HTTP client shared by the feed lister and the workers.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let fetcher: Arc<dyn Fetcher> =
            Arc::new(ReqwestFetcher::new(config.fetch_settings()).map_err(PipelineError::Client)?);
        let lister = Arc::new(FeedLister::new(
            fetcher.clone(),
            config.feed_url.clone(),
            config.feed_batch_size,
        ));
        Ok(Self::with_parts(config, fetcher, lister))
    }

    /// `lister` is wrapped with the posts cache on every listing.
    pub fn with_parts(
        config: PipelineConfig,
        fetcher: Arc<dyn Fetcher>,
        lister: Arc<dyn SourceLister>,
    ) -> Self {
        Self {
            config,
            fetcher,
            lister,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Cached listing unless `refresh`; a failed refresh still falls back to the cache.
    pub async fn list_sources(
        &self,
        refresh: bool,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<SourceItem>, PipelineError> {
        let lister = CachedLister::new(
            self.lister.clone(),
            self.config.posts_cache_path(),
            !refresh,
        );
        Ok(lister.list(sink).await?)
    }

    pub async fn run(
        &self,
        selection: &Selection,
        refresh: bool,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, PipelineError> {
        let listed = self.list_sources(refresh, sink).await?;
        let selected = selection.apply(&listed)?;

        let extractor = Arc::new(SelectorExtractor::new(
            self.config.content_selectors.as_slice(),
        ));
        let worker = FetchWorker::new(
            self.fetcher.clone(),
            extractor,
            self.config.request_timeout(),
            self.config.retry_policy(),
        );
        let coordinator = Coordinator::new(
            Arc::new(worker),
            self.store_file(),
            self.checkpoint_file(),
            self.config.coordinator_settings(),
        );
        let outcome = coordinator.run(&selected, cancel, sink).await?;
        let export = self.export(&selected)?;
        Ok(RunReport { outcome, export })
    }

    /// Re-render the output from the store and the posts cache. Never touches
    /// the network; without a cached listing this is an error.
    pub async fn assemble(
        &self,
        selection: &Selection,
        sink: &dyn ProgressSink,
    ) -> Result<ExportSummary, PipelineError> {
        let cache_path = self.config.posts_cache_path();
        let listed = JsonFile::<Vec<SourceItem>>::new(&cache_path)
            .load()
            .filter(|items| !items.is_empty())
            .ok_or(ListError::NoCache(cache_path))?;
        sink.emit(ProgressEvent::Listing {
            message: format!("Loaded {} posts from cache", listed.len()),
        });
        let selected = selection.apply(&listed)?;
        self.export(&selected)
    }

    /// Progress of the last recorded selection, recomputed against the store.
    pub fn status(&self) -> Checkpoint {
        let recorded = self.checkpoint_file().load();
        let store = self.store_file().load();
        Checkpoint::derive_from_urls(recorded.selected, &store)
    }

    fn export(&self, selected: &[SourceItem]) -> Result<ExportSummary, PipelineError> {
        let store = self.store_file().load();
        let urls: Vec<String> = selected.iter().map(|item| item.url.clone()).collect();
        Ok(export_pages(
            &self.config.output_dir,
            &urls,
            &store,
            &self.config.export_options(),
        )?)
    }

    fn store_file(&self) -> ContentStoreFile {
        ContentStoreFile::new(self.config.results_path())
    }

    fn checkpoint_file(&self) -> CheckpointFile {
        CheckpointFile::new(self.config.checkpoint_path())
    }
}
