//! Command-line surface for the post bundler.
//!
//! Every tunable can also come from the RON config file (`--config`); flags
//! and their environment variables win over the file.

use std::path::PathBuf;

use bundler_core::Selection;
use bundler_engine::{FailurePolicy, PipelineConfig};
use bundler_logging::LogDestination;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

/// Collect blog posts into paginated HTML, resumably.
///
/// ```sh
/// # fetch everything, 500 posts per page
/// post-bundler run --all
///
/// # nightly job: at most 200 new fetches per invocation
/// post-bundler run --batch-limit 200
///
/// # one blog at a time from a queue
/// post-bundler blog-queue add https://a.blogspot.com/ https://b.blogspot.com/
/// post-bundler blog-queue next
/// ```
#[derive(Parser, Debug)]
#[command(name = "post-bundler", author, version, about)]
pub struct Cli {
    /// RON config file; fields left out keep their defaults
    #[arg(short, long, env = "BUNDLER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[arg(long, env = "LOG_LEVEL", default_value = "info", value_parser = parse_level, global = true)]
    pub log_level: LevelFilter,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        if self.log_file.is_some() {
            LogDestination::Both
        } else {
            LogDestination::Terminal
        }
    }
}

fn parse_level(raw: &str) -> Result<LevelFilter, String> {
    raw.parse()
        .map_err(|_| format!("unknown log level {raw:?}"))
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List, fetch whatever is missing, then write the pages
    Run {
        #[command(flatten)]
        select: SelectArgs,

        /// Stop dispatching after this many fetches
        #[arg(long, env = "BATCH_LIMIT")]
        batch_limit: Option<usize>,

        /// Re-read the feed instead of the posts cache
        #[arg(long)]
        refresh_list: bool,
    },
    /// Rewrite the pages from what is already fetched
    Assemble {
        #[command(flatten)]
        select: SelectArgs,
    },
    /// Show how much of the last selection is fetched
    Status,
    /// Per-blog mode
    #[command(subcommand)]
    BlogQueue(QueueCommand),
}

#[derive(Subcommand, Debug)]
pub enum QueueCommand {
    /// Append blogs to the queue
    Add {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Run the blog at the head of the queue to completion
    Next,
}

#[derive(Args, Debug)]
#[group(multiple = false)]
pub struct SelectArgs {
    /// Every listed post (default)
    #[arg(long)]
    pub all: bool,

    /// Comma separated post urls
    #[arg(long)]
    pub links: Option<String>,

    /// The first N listed posts
    #[arg(long)]
    pub first: Option<usize>,
}

impl SelectArgs {
    pub fn selection(&self) -> Selection {
        if let Some(links) = &self.links {
            Selection::links_from_csv(links)
        } else if let Some(n) = self.first {
            Selection::First(n)
        } else {
            Selection::All
        }
    }
}

/// Flags mirroring the classic environment variables of the nightly job.
#[derive(Args, Debug)]
pub struct Overrides {
    #[arg(long, env = "BLOG_URL", global = true)]
    pub blog_url: Option<String>,

    /// Posts per output page
    #[arg(long, env = "PART_SIZE", global = true)]
    pub part_size: Option<usize>,

    #[arg(long, env = "PART_PREFIX", global = true)]
    pub part_prefix: Option<String>,

    #[arg(long, env = "CHECKPOINT_EVERY", global = true)]
    pub checkpoint_every: Option<usize>,

    /// Concurrent fetches
    #[arg(long, env = "MAX_WORKERS", global = true)]
    pub max_workers: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", global = true)]
    pub request_timeout: Option<u64>,

    #[arg(long, env = "STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    #[arg(long, env = "OUTPUT_DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Keep failed posts out of the store so the next run retries them
    #[arg(long, global = true)]
    pub retry_failed: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(url) = &self.blog_url {
            config.feed_url = url.clone();
        }
        if let Some(size) = self.part_size {
            config.page_size = size;
        }
        if let Some(prefix) = &self.part_prefix {
            config.page_prefix = prefix.clone();
        }
        if let Some(every) = self.checkpoint_every {
            config.checkpoint_every = every;
        }
        if let Some(workers) = self.max_workers {
            config.concurrency = workers;
        }
        if let Some(secs) = self.request_timeout {
            config.request_timeout_secs = secs;
        }
        if let Some(dir) = &self.state_dir {
            config.state_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.retry_failed {
            config.failure_policy = FailurePolicy::RetryNextRun;
        }
    }
}
