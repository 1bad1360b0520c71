//! Monitor runtime - wires the source, stats core, and sinks together
//!
//! ```text
//! record_source_task ─→ ingestion_task ─→ Arc<Site> ←─ alert_monitor_task
//!                                                   ←─ summary_reporter_task
//!                              all events ─→ event_sink_task
//! ```
//!
//! Shutdown is driven by one `CancellationToken`. End of input closes the
//! record channel, ingestion cancels the token, the periodic tasks stop, and
//! the event channel drains once its last sender is gone.

use crate::config::MonitorConfig;
use crate::output::{event_sink_task, EventSink};
use crate::source::{record_source_task, ReadMode, SourceError, TailReader};
use crate::stats_core::{
    alert_monitor_task, ingestion_task, reporter::DEFAULT_SUMMARY_PERIOD, summary_reporter_task,
    AlertMonitor, AlertSchedule, CounterError, Site, TopNReporter, TrafficEvent,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub enum MonitorError {
    Counter(CounterError),
    Source(SourceError),
    Task(tokio::task::JoinError),
}

impl From<CounterError> for MonitorError {
    fn from(err: CounterError) -> Self {
        MonitorError::Counter(err)
    }
}

impl From<SourceError> for MonitorError {
    fn from(err: SourceError) -> Self {
        MonitorError::Source(err)
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Source(SourceError::Io(err))
    }
}

impl From<tokio::task::JoinError> for MonitorError {
    fn from(err: tokio::task::JoinError) -> Self {
        MonitorError::Task(err)
    }
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorError::Counter(e) => write!(f, "Counter setup error: {}", e),
            MonitorError::Source(e) => write!(f, "{}", e),
            MonitorError::Task(e) => write!(f, "Task failed: {}", e),
        }
    }
}

impl std::error::Error for MonitorError {}

/// Counts from a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorReport {
    pub records_read: u64,
    pub records_ingested: u64,
    pub events_emitted: u64,
}

/// Run the monitor until end of input (replay mode), a source failure, or
/// `cancel` firing.
///
/// In replay mode a final summary is emitted after the last record so a short
/// file still produces a report. A source failure is returned after every
/// task has stopped.
pub async fn run_monitor(
    config: &MonitorConfig,
    sinks: Vec<Box<dyn EventSink>>,
    cancel: CancellationToken,
) -> Result<MonitorReport, MonitorError> {
    let site = Arc::new(Site::new(config.site_name.clone())?);

    let mut reader = TailReader::new(config.log_file.clone(), config.read_mode);
    reader.start().await?;

    let (record_tx, record_rx) = mpsc::channel(config.channel_buffer);
    let (event_tx, event_rx) = mpsc::channel::<TrafficEvent>(config.channel_buffer);

    let sink_handle = tokio::spawn(event_sink_task(event_rx, sinks));

    let source_handle = tokio::spawn(record_source_task(reader, record_tx, cancel.clone()));

    let ingestion_handle = tokio::spawn(ingestion_task(
        record_rx,
        Arc::clone(&site),
        event_tx.clone(),
        cancel.clone(),
    ));

    let alert_handle = tokio::spawn(alert_monitor_task(
        Arc::clone(&site),
        AlertMonitor::new(config.rate_threshold),
        AlertSchedule::default(),
        event_tx.clone(),
        cancel.clone(),
    ));

    let reporter = TopNReporter::default();
    let reporter_handle = tokio::spawn(summary_reporter_task(
        Arc::clone(&site),
        reporter.clone(),
        DEFAULT_SUMMARY_PERIOD,
        event_tx.clone(),
        cancel.clone(),
    ));

    log::info!("✅ Monitor running for site {}", site.name());

    let source_result = source_handle.await?;
    if let Err(e) = &source_result {
        log::error!("❌ Record source failed: {}", e);
        cancel.cancel();
    }

    let records_ingested = ingestion_handle.await?;
    alert_handle.await?;
    reporter_handle.await?;

    if config.read_mode == ReadMode::Replay && source_result.is_ok() {
        match reporter.summarize(&site) {
            Ok(summary) => {
                if let Err(e) = event_tx.send(TrafficEvent::PeriodicSummary(summary)).await {
                    log::error!("Could not emit final summary: {}", e);
                }
            }
            Err(e) => log::error!("Could not build final summary: {}", e),
        }
    }
    drop(event_tx);

    let events_emitted = sink_handle.await?;
    let records_read = source_result?;

    log::info!(
        "Monitor stopped ({} read, {} ingested, {} events)",
        records_read,
        records_ingested,
        events_emitted
    );

    Ok(MonitorReport {
        records_read,
        records_ingested,
        events_emitted,
    })
}
