//! Where traffic events end up
//!
//! Alerts, recoveries, summaries, and anomalies are handed to each
//! configured sink in order. A sink that fails reports a `SinkError` and the
//! event still reaches the others.

use crate::stats_core::TrafficEvent;
use async_trait::async_trait;

#[derive(Debug)]
pub enum SinkError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err)
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialization(err)
    }
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Io(e) => write!(f, "event output failed: {}", e),
            SinkError::Serialization(e) => write!(f, "event could not be encoded: {}", e),
        }
    }
}

impl std::error::Error for SinkError {}

#[async_trait]
pub trait EventSink: Send {
    /// Render or record one event. Buffered sinks may hold it until `flush`.
    async fn emit(&mut self, event: &TrafficEvent) -> Result<(), SinkError>;

    /// Push buffered events to the terminal or file now
    async fn flush(&mut self) -> Result<(), SinkError>;

    /// Short name used in log lines, e.g. `"console"`
    fn sink_type(&self) -> &'static str;
}
