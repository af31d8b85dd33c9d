mod cli;
mod config;
mod progress;

use std::process::ExitCode;

use bundler_core::RunStatus;
use bundler_engine::{
    run_next_queued, BlogQueueFile, ChannelProgressSink, Pipeline, PipelineConfig, RunReport,
};
use bundler_logging::{bundler_error, bundler_info, bundler_warn};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Command, QueueCommand};
use crate::progress::{print_events, status_label};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    bundler_logging::initialize(cli.log_destination(), cli.log_level, cli.log_file.as_deref());

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            bundler_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = config::load_config(cli.config.as_deref())?;
    cli.overrides.apply(&mut config);

    match cli.command {
        Command::Run {
            select,
            batch_limit,
            refresh_list,
        } => {
            if batch_limit.is_some() {
                config.batch_limit = batch_limit;
            }
            let pipeline = Pipeline::new(config)?;
            let cancel = cancel_on_ctrl_c();
            let (sink, events) = ChannelProgressSink::channel();
            let printer = tokio::spawn(print_events(events));

            let result = pipeline
                .run(&select.selection(), refresh_list, &cancel, &sink)
                .await;
            drop(sink);
            let _ = printer.await;

            let report = result?;
            print_report(&report);
            Ok(exit_code(report.outcome.status))
        }
        Command::Assemble { select } => {
            let pipeline = Pipeline::new(config)?;
            let (sink, events) = ChannelProgressSink::channel();
            let printer = tokio::spawn(print_events(events));
            let result = pipeline.assemble(&select.selection(), &sink).await;
            drop(sink);
            let _ = printer.await;

            let summary = result?;
            println!(
                "Wrote {} pages ({} posts, {} not fetched yet) to {}",
                summary.page_count,
                summary.item_count,
                summary.missing,
                pipeline.config().output_dir.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            print_status(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::BlogQueue(QueueCommand::Add { urls }) => {
            let queue_file = BlogQueueFile::new(config.blog_queue_path());
            let added = queue_file.add(urls)?;
            let queue = queue_file.load();
            println!(
                "Queued {added} new blogs; {} pending, {} done",
                queue.pending.len(),
                queue.done.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::BlogQueue(QueueCommand::Next) => {
            let cancel = cancel_on_ctrl_c();
            let (sink, events) = ChannelProgressSink::channel();
            let printer = tokio::spawn(print_events(events));
            let result = run_next_queued(&config, &cancel, &sink).await;
            drop(sink);
            let _ = printer.await;

            match result? {
                Some(run) => {
                    println!("Blog {} ({})", run.blog_url, run.slug);
                    print_report(&run.report);
                    Ok(exit_code(run.report.outcome.status))
                }
                None => {
                    println!("Blog queue is empty");
                    Ok(ExitCode::SUCCESS)
                }
            }
        }
    }
}

fn print_status(config: &PipelineConfig) -> anyhow::Result<()> {
    let checkpoint = Pipeline::new(config.clone())?.status();
    if checkpoint.selected.is_empty() {
        println!("No run recorded in {}", config.state_dir.display());
        return Ok(());
    }
    println!(
        "{}/{} fetched, {} remaining",
        checkpoint.completed.len(),
        checkpoint.selected.len(),
        checkpoint.remaining().len()
    );
    Ok(())
}

fn print_report(report: &RunReport) {
    let outcome = &report.outcome;
    println!(
        "{}: {} fetched this run ({} failed), {} were cached, {} of {} remaining",
        status_label(outcome.status),
        outcome.fetched,
        outcome.failed,
        outcome.already_cached,
        outcome.remaining.len(),
        outcome.total
    );
    println!(
        "{} pages written, {} posts not fetched yet",
        report.export.page_count, report.export.missing
    );
}

fn exit_code(status: RunStatus) -> ExitCode {
    match status {
        RunStatus::Completed | RunStatus::BatchLimited => ExitCode::SUCCESS,
        RunStatus::Cancelled => ExitCode::from(2),
    }
}

/// Ctrl-C stops dispatching; fetches already running are kept.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                bundler_warn!("Interrupt received; finishing in-flight fetches");
                trigger.cancel();
            }
            Err(err) => bundler_info!("Ctrl-C handler unavailable: {}", err),
        }
    });
    token
}
