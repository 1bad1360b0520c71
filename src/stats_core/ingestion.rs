//! Ingestion loop: drains parsed records from the source channel into the site

use super::events::TrafficEvent;
use super::site::Site;
use crate::source::LogRecord;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const THROUGHPUT_LOG_SECS: u64 = 10;

/// Feed every record from `rx` into `site` until the channel closes or `cancel` fires.
///
/// Records with an unclassifiable response code become `AnomalyObserved`
/// events. When the channel closes (the source hit end of input or failed),
/// `cancel` is triggered so the periodic tasks wind down too.
///
/// Returns the number of records ingested.
pub async fn ingestion_task(
    mut rx: mpsc::Receiver<LogRecord>,
    site: Arc<Site>,
    events: mpsc::Sender<TrafficEvent>,
    cancel: CancellationToken,
) -> u64 {
    log::info!("Ingestion started for site {}", site.name());

    let mut total = 0u64;
    let mut since_log = 0u64;
    let mut last_log_time = Instant::now();

    loop {
        let record = tokio::select! {
            _ = cancel.cancelled() => {
                log::info!("Ingestion cancelled");
                break;
            }
            record = rx.recv() => record,
        };

        let Some(record) = record else {
            log::info!("Record source closed, stopping");
            cancel.cancel();
            break;
        };

        if site.ingest(&record).is_none() {
            log::warn!(
                "Unclassified response code {} for {}",
                record.response_code,
                record.path
            );
            let anomaly = TrafficEvent::AnomalyObserved {
                response_code: record.response_code,
            };
            if let Err(e) = events.send(anomaly).await {
                log::error!("Ingestion could not emit anomaly event: {}", e);
            }
        }

        total += 1;
        since_log += 1;

        if last_log_time.elapsed().as_secs() >= THROUGHPUT_LOG_SECS {
            let per_sec = since_log as f64 / last_log_time.elapsed().as_secs_f64();
            log::info!("Ingestion rate: {:.1} records/sec (total: {})", per_sec, total);
            last_log_time = Instant::now();
            since_log = 0;
        }
    }

    log::info!("Ingestion stopped after {} records", total);
    total
}
