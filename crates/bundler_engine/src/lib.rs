//! Bundler engine: persistence, fetching, listing, coordination and export.
mod config;
mod coordinator;
mod decode;
mod engine;
mod export;
mod extract;
mod fetch;
mod listing;
mod persist;
mod progress;
mod queue;
mod types;
mod worker;

pub use config::PipelineConfig;
pub use coordinator::{Coordinator, CoordinatorSettings, FailurePolicy};
pub use decode::{decode_html, DecodedHtml};
pub use engine::{Pipeline, RunReport};
pub use export::{export_pages, ExportError, ExportOptions, ExportSummary};
pub use extract::{
    ContentOrigin, ExtractedContent, Extractor, SelectorExtractor, DEFAULT_CONTENT_SELECTORS,
};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use listing::{feed_page_url, parse_feed, CachedLister, FeedLister, ListError, SourceLister};
pub use persist::{
    ensure_output_dir, AtomicFileWriter, CheckpointFile, ContentStoreFile, JsonFile, PersistError,
};
pub use progress::{ChannelProgressSink, NoopProgressSink, ProgressSink};
pub use queue::{run_next_queued, BlogQueue, BlogQueueFile, QueuedRun};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput, PipelineError};
pub use worker::{FetchWorker, RetryPolicy};
