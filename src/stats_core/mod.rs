//! Stats Core - Traffic Aggregation and Alerting Engine
//!
//! Keeps windowed request counters for an access log and raises events from
//! them. Nothing in here prints; presentation lives in [`crate::output`].
//!
//! # Architecture
//!
//! ```text
//! mpsc<LogRecord> → ingestion_task → Site::ingest
//!                                      ├─ 2m rate counter ──────→ alert_monitor_task (1s)
//!                                      ├─ 10s class counters ──┐
//!                                      └─ SectionRegistry ─────┴→ summary_reporter_task (10s)
//!                                                                        ↓
//!                                                               mpsc<TrafficEvent>
//! ```
//!
//! The site is shared as `Arc<Site>`. The registry sits behind an `RwLock` and
//! each counter behind its own mutex, so the two periodic readers can run in
//! parallel with ingestion.

pub mod alert;
pub mod counter;
pub mod events;
pub mod ingestion;
pub mod reporter;
pub mod response;
pub mod section;
pub mod site;

pub use alert::{alert_monitor_task, AlertMonitor, AlertSchedule, AlertState};
pub use counter::{CounterError, CounterShape, WindowedCounter};
pub use events::{SectionCount, Summary, TrafficEvent};
pub use ingestion::ingestion_task;
pub use reporter::{rank_sections, summary_reporter_task, TopNReporter};
pub use response::{ClassCounts, ResponseClass};
pub use section::{section_of, Section, SectionRegistry};
pub use site::Site;
