mod seed;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use reelcore_config::Settings;
use reelcore_task::{PendingTask, PrimeReport, RequestId, TaskOutcome};
use reeld::{ReelService, VisibleSlice};
use serde::Serialize;
use tracing::{debug, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(about = "Filter and window a large record set; count primes off the interactive thread")]
struct CliArgs {
    /// TOML settings file. Flags below override it.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Number of synthetic records to generate.
    #[clap(long)]
    pub records: Option<usize>,

    /// Seed for reproducible synthetic data.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Filter text matched against title and category.
    #[clap(short, long, default_value = "")]
    pub query: String,

    /// Scroll offset in row-extent units (pixels in the default geometry).
    #[clap(long, default_value_t = 0.0)]
    pub scroll: f64,

    #[clap(long)]
    pub row_extent: Option<u32>,

    #[clap(long)]
    pub viewport_extent: Option<u32>,

    #[clap(long)]
    pub overscan: Option<u32>,

    /// Upper bound for the background prime count. Validated before dispatch.
    #[clap(long)]
    pub prime_limit: Option<String>,

    /// Cancel the background task after this many milliseconds.
    #[clap(long)]
    pub cancel_after_ms: Option<u64>,

    /// Interval of the simulated scroll events serviced while the task runs.
    #[clap(long, default_value_t = 16)]
    pub tick_ms: u64,

    /// Print JSON instead of text.
    #[clap(long)]
    pub json: bool,

    /// Default log level; LOG_LEVEL overrides it.
    #[clap(long, default_value_t = LevelFilter::INFO)]
    pub log_level: LevelFilter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskSummary {
    request_id: RequestId,
    cancelled: bool,
    scroll_events_serviced: u64,
    #[serde(flatten)]
    report: Option<PrimeReport>,
}

const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

fn log_filter(default_level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_LEVEL_ENV)
        .from_env_lossy()
}

fn init_tracing(default_level: LevelFilter) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(default_level))
        .init();
}

fn resolve_settings(args: &CliArgs) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };

    if let Some(records) = args.records {
        settings.store.record_count = records;
    }
    if let Some(row_extent) = args.row_extent {
        settings.viewport.row_extent = row_extent;
    }
    if let Some(viewport_extent) = args.viewport_extent {
        settings.viewport.viewport_extent = viewport_extent;
    }
    if let Some(overscan) = args.overscan {
        settings.viewport.overscan = overscan;
    }

    settings.validate().context("invalid settings")?;
    Ok(settings)
}

fn print_slice(slice: &VisibleSlice<'_>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(slice)?);
        return Ok(());
    }

    println!(
        "Showing {} records, rows {}..{}",
        slice.filtered_count, slice.range.start_index, slice.range.end_index
    );
    if slice.filtered_count == 0 {
        println!("No records match your filter.");
    }
    for record in &slice.records {
        println!(
            "{:>8}  {:<24} {:<8} {} *",
            record.id, record.title, record.category, record.rating
        );
    }
    Ok(())
}

fn print_summary(summary: &TaskSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    match &summary.report {
        Some(report) => println!(
            "Request {}: {} primes, last {}, {:.2} ms ({} scroll events serviced meanwhile)",
            summary.request_id,
            report.match_count,
            report.last_match,
            report.elapsed_millis,
            summary.scroll_events_serviced
        ),
        None => println!(
            "Request {} cancelled ({} scroll events serviced meanwhile)",
            summary.request_id, summary.scroll_events_serviced
        ),
    }
    Ok(())
}

/// Keeps feeding scroll events to the viewport until the background response lands.
async fn service_until_done(
    service: &mut ReelService,
    pending: PendingTask,
    tick: Duration,
    cancel_after: Option<Duration>,
) -> Result<TaskSummary> {
    let request_id = pending.request_id();
    let cancel = pending.cancellation_token().clone();
    let response = pending.wait();
    tokio::pin!(response);

    let deadline = async move {
        match cancel_after {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval(tick);
    let mut scroll_events = 0u64;
    let mut cancel_sent = false;

    let outcome = loop {
        tokio::select! {
            result = &mut response => break result?,
            _ = &mut deadline, if !cancel_sent => {
                warn!(request_id, "cancelling background request");
                cancel.cancel();
                cancel_sent = true;
            }
            _ = ticker.tick() => {
                let viewport = service.viewport_mut();
                let geometry = viewport.geometry();
                let max_offset = geometry.max_scroll_offset(viewport.filtered_len());
                let mut next = viewport.scroll_offset() + f64::from(geometry.row_extent());
                if next > max_offset {
                    next = 0.0;
                }
                let range = viewport.on_scroll(next)?;
                scroll_events += 1;
                debug!(
                    offset = next,
                    start = range.start_index,
                    end = range.end_index,
                    "scroll tick"
                );
            }
        }
    };

    let report = match outcome {
        TaskOutcome::Completed { report, .. } => Some(report),
        TaskOutcome::Cancelled { .. } => None,
    };
    Ok(TaskSummary {
        request_id,
        cancelled: report.is_none(),
        scroll_events_serviced: scroll_events,
        report,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_level);

    let settings = resolve_settings(&args)?;
    let store = Arc::new(seed::generate_store(settings.store.record_count, args.seed)?);
    info!(records = store.len(), "store generated");

    let mut service = ReelService::new(settings, store)?;
    service.viewport_mut().on_query_change(&args.query);
    service
        .viewport_mut()
        .on_scroll(args.scroll)
        .context("invalid --scroll")?;
    print_slice(&service.viewport().visible_slice(), args.json)?;

    let pending = match &args.prime_limit {
        Some(input) => service
            .tasks()
            .dispatch_input(input)
            .context("invalid --prime-limit")?,
        None => service.start_prime_count(None)?,
    };

    let summary = service_until_done(
        &mut service,
        pending,
        Duration::from_millis(args.tick_ms.max(1)),
        args.cancel_after_ms.map(Duration::from_millis),
    )
    .await?;
    print_summary(&summary, args.json)?;

    service.shutdown()?;
    Ok(())
}
