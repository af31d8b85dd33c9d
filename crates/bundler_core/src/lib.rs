//! Bundler core: pure domain types, checkpoint derivation and page assembly.
mod assemble;
mod checkpoint;
mod progress;
mod snippet;
mod source;
mod store;

pub use assemble::{
    page_file_name, paginate, render_index, render_page, OutputPage, PageTemplate,
};
pub use checkpoint::Checkpoint;
pub use progress::{ProgressEvent, RunOutcome, RunStatus};
pub use snippet::{
    not_fetched_placeholder, render_failure, render_post, Snippet, SnippetKind,
    CONTENT_UNAVAILABLE, FETCH_ERROR_MARKER,
};
pub use source::{collection_slug, dedupe_by_url, Selection, SelectionError, SourceItem};
pub use store::ContentStore;
