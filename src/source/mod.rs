//! Record Source - access log lines in, `LogRecord`s out
//!
//! ```text
//! access.log → TailReader (follow / tail / replay) → LogRecord::parse → mpsc<LogRecord>
//! ```
//!
//! The source task owns the only sender of the record channel. When it
//! returns, for end of input or a read error, the channel closes and ingestion
//! shuts the rest of the pipeline down.

pub mod reader;
pub mod record;

pub use reader::{ReadMode, TailReader};
pub use record::{LogRecord, RecordError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub enum SourceError {
    Io(std::io::Error),
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err)
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io(e) => write!(f, "Record source IO error: {}", e),
        }
    }
}

impl std::error::Error for SourceError {}

/// Read, parse, and forward records until end of input, cancellation, or a
/// read error. Unparseable lines are skipped.
///
/// Returns the number of records forwarded.
pub async fn record_source_task(
    mut reader: TailReader,
    tx: mpsc::Sender<LogRecord>,
    cancel: CancellationToken,
) -> Result<u64, SourceError> {
    let mut forwarded = 0u64;
    let mut skipped = 0u64;

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = reader.read_line() => line?,
        };

        let Some(line) = line else {
            log::info!("End of input: {}", reader.path().display());
            break;
        };

        let record = match LogRecord::parse(&line) {
            Ok(record) => record,
            Err(e) => {
                skipped += 1;
                log::debug!("Skipping unparseable line ({}): {}", e, line);
                continue;
            }
        };

        if tx.send(record).await.is_err() {
            log::warn!("Record channel closed, stopping source");
            break;
        }
        forwarded += 1;
    }

    log::info!(
        "Record source stopped ({} forwarded, {} skipped)",
        forwarded,
        skipped
    );
    Ok(forwarded)
}
