use bundler_core::{ProgressEvent, RunStatus};
use tokio::sync::mpsc::UnboundedReceiver;

/// Print events until every sender is dropped.
pub async fn print_events(mut events: UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = events.recv().await {
        if let Some(line) = describe(&event) {
            println!("{line}");
        }
    }
}

/// One status line per event. Checkpoints are quiet.
pub fn describe(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::Listing { message } => Some(message.clone()),
        ProgressEvent::Started {
            total,
            already_cached,
            pending,
        } => Some(format!(
            "{total} selected, {already_cached} already fetched, {pending} to go"
        )),
        ProgressEvent::Fetched {
            title,
            completed,
            total,
            placeholder,
            ..
        } => {
            let mark = if *placeholder { "failed" } else { "ok" };
            Some(format!("[{completed}/{total}] {mark}: {title}"))
        }
        ProgressEvent::Checkpointed { .. } => None,
        ProgressEvent::CancelRequested => {
            Some("Stopping: waiting for in-flight fetches to finish".to_string())
        }
        ProgressEvent::Finished {
            status,
            completed,
            total,
        } => Some(format!("{}: {completed}/{total} fetched", status_label(*status))),
    }
}

pub fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Completed => "Done",
        RunStatus::Cancelled => "Cancelled",
        RunStatus::BatchLimited => "Batch limit reached",
    }
}
