//! Site-wide traffic aggregation: the single ingestion entry point

use super::counter::{CounterError, CounterShape, WindowedCounter};
use super::events::SectionCount;
use super::response::{ClassCounters, ClassCounts, ResponseClass};
use super::section::{section_of, Section, SectionRegistry};
use crate::source::LogRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Bucket width for every counter
pub const RESOLUTION: Duration = Duration::from_secs(1);
/// Window of the global rate counter watched by the alert monitor
pub const RATE_WINDOW: Duration = Duration::from_secs(2 * 60);
/// Window of the class counters and per-section counters
pub const SUMMARY_WINDOW: Duration = Duration::from_secs(10);

/// Traffic state for one monitored site
///
/// Shared as `Arc<Site>` between the ingestion task (the only writer) and the
/// alert and summary tasks (readers).
#[derive(Debug)]
pub struct Site {
    name: String,
    rate: WindowedCounter,
    classes: ClassCounters,
    sections: SectionRegistry,
}

impl Site {
    pub fn new(name: impl Into<String>) -> Result<Self, CounterError> {
        Self::with_windows(name, RESOLUTION, RATE_WINDOW, SUMMARY_WINDOW)
    }

    pub fn with_windows(
        name: impl Into<String>,
        resolution: Duration,
        rate_window: Duration,
        summary_window: Duration,
    ) -> Result<Self, CounterError> {
        let rate_shape = CounterShape::new(resolution, rate_window)?;
        let summary_shape = CounterShape::new(resolution, summary_window)?;
        let origin = Instant::now();

        Ok(Self {
            name: name.into(),
            rate: WindowedCounter::new(rate_shape, origin),
            classes: ClassCounters::new(summary_shape, origin),
            sections: SectionRegistry::new(summary_shape, origin),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fold one record into the counters.
    ///
    /// Returns the response class, or `None` when the code is outside
    /// 200..=599. Unclassified records still count toward the global rate and
    /// their section's hits.
    pub fn ingest(&self, record: &LogRecord) -> Option<ResponseClass> {
        self.rate.add(1);

        let section = self.sections.get_or_create(section_of(&record.path));
        let class = ResponseClass::from_code(record.response_code);

        if let Some(class) = class {
            self.classes.record(class);
        }
        section.record(class);

        class
    }

    pub fn rate_total(&self, d: Duration) -> Result<u64, CounterError> {
        self.rate.total(d)
    }

    pub fn rate_average(&self, d: Duration) -> Result<f64, CounterError> {
        self.rate.average(d)
    }

    pub fn class_totals(&self, d: Duration) -> Result<ClassCounts, CounterError> {
        self.classes.totals(d)
    }

    pub fn section(&self, name: &str) -> Option<Arc<Section>> {
        self.sections.get(name)
    }

    /// Trailing-`d` hit count of every section, in no particular order
    pub fn section_samples(&self, d: Duration) -> Result<Vec<SectionCount>, CounterError> {
        self.sections
            .snapshot()
            .into_iter()
            .map(|section| {
                Ok(SectionCount {
                    name: section.name().to_string(),
                    count: section.hits(d)?,
                })
            })
            .collect()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}
