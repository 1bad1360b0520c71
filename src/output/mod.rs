//! Output - presents traffic events
//!
//! ```text
//! mpsc<TrafficEvent> → event_sink_task → ConsoleSink (colored stdout)
//!                                      → JsonlSink   (optional event log)
//! ```
//!
//! The stats core never prints. Every alert, recovery, summary, and anomaly
//! passes through the event channel and is fanned out to the configured sinks.

pub mod console;
pub mod jsonl;
pub mod sink;

pub use console::ConsoleSink;
pub use jsonl::JsonlSink;
pub use sink::{EventSink, SinkError};

use crate::stats_core::TrafficEvent;
use tokio::sync::mpsc;

/// Deliver every event to every sink until all senders are dropped.
///
/// A failing sink is logged and skipped for that event; it does not stop
/// delivery to the others. Sinks are flushed after each event and once more
/// on shutdown. Returns the number of events received.
pub async fn event_sink_task(
    mut rx: mpsc::Receiver<TrafficEvent>,
    mut sinks: Vec<Box<dyn EventSink>>,
) -> u64 {
    let names: Vec<&str> = sinks.iter().map(|sink| sink.sink_type()).collect();
    log::info!("Event output started ({})", names.join(", "));

    let mut received = 0u64;
    while let Some(event) = rx.recv().await {
        received += 1;
        for sink in sinks.iter_mut() {
            if let Err(e) = sink.emit(&event).await {
                log::error!("{} sink failed on {}: {}", sink.sink_type(), event.kind(), e);
                continue;
            }
            if let Err(e) = sink.flush().await {
                log::error!("{} sink flush failed: {}", sink.sink_type(), e);
            }
        }
    }

    for sink in sinks.iter_mut() {
        if let Err(e) = sink.flush().await {
            log::error!("Final {} flush failed: {}", sink.sink_type(), e);
        }
    }
    log::info!("Event output stopped after {} events", received);
    received
}
