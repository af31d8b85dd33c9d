/// Terminal state of one coordinator invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every selected url was dispatched; none is left for this invocation.
    Completed,
    /// Cancellation was requested; in-flight work was kept.
    Cancelled,
    /// The per-invocation batch limit was reached with work still pending.
    BatchLimited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub total: usize,
    pub already_cached: usize,
    pub fetched: usize,
    pub failed: usize,
    /// Selected urls still missing from the store after this run.
    pub remaining: Vec<String>,
}

/// Events for presentation layers. The pipeline never depends on who listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Listing {
        message: String,
    },
    Started {
        total: usize,
        already_cached: usize,
        pending: usize,
    },
    Fetched {
        url: String,
        title: String,
        completed: usize,
        total: usize,
        placeholder: bool,
    },
    Checkpointed {
        completed: usize,
        total: usize,
    },
    CancelRequested,
    Finished {
        status: RunStatus,
        completed: usize,
        total: usize,
    },
}
