//! Periodic top-N section ranking and response-class summary

use super::counter::CounterError;
use super::events::{SectionCount, Summary, TrafficEvent};
use super::site::{Site, SUMMARY_WINDOW};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TOP_SECTIONS: usize = 5;
pub const DEFAULT_SUMMARY_PERIOD: Duration = Duration::from_secs(10);

/// Busiest first; equal counts fall back to ascending name so output is stable.
fn by_rank(a: &SectionCount, b: &SectionCount) -> Ordering {
    b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name))
}

/// Keep the `k` highest-ranked samples, sorted.
pub fn rank_sections(mut samples: Vec<SectionCount>, k: usize) -> Vec<SectionCount> {
    if k == 0 {
        return Vec::new();
    }
    if samples.len() > k {
        samples.select_nth_unstable_by(k - 1, by_rank);
        samples.truncate(k);
    }
    samples.sort_by(by_rank);
    samples
}

#[derive(Debug, Clone)]
pub struct TopNReporter {
    top_k: usize,
}

impl Default for TopNReporter {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_SECTIONS)
    }
}

impl TopNReporter {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn summarize(&self, site: &Site) -> Result<Summary, CounterError> {
        let samples = site.section_samples(SUMMARY_WINDOW)?;
        Ok(Summary {
            ranked_sections: rank_sections(samples, self.top_k),
            class_counts: site.class_totals(SUMMARY_WINDOW)?,
        })
    }
}

/// Summary task: emits one `PeriodicSummary` right away and then once per
/// `period`, until cancelled.
pub async fn summary_reporter_task(
    site: Arc<Site>,
    reporter: TopNReporter,
    period: Duration,
    events: mpsc::Sender<TrafficEvent>,
    cancel: CancellationToken,
) {
    log::info!(
        "Summary reporter started (top {}, every {:?})",
        reporter.top_k(),
        period
    );

    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if cancel.is_cancelled() {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = timer.tick() => {}
        }

        let summary = match reporter.summarize(&site) {
            Ok(summary) => summary,
            Err(e) => {
                log::error!("Summary reporter failed to read counters: {}", e);
                continue;
            }
        };

        log::debug!(
            "Summary: {} ranked of {} sections",
            summary.ranked_sections.len(),
            site.section_count()
        );

        if let Err(e) = events.send(TrafficEvent::PeriodicSummary(summary)).await {
            log::error!("Summary reporter could not emit event: {}", e);
            break;
        }
    }

    log::info!("Summary reporter stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::LogRecord;

    fn sample(name: &str, count: u64) -> SectionCount {
        SectionCount {
            name: name.to_string(),
            count,
        }
    }

    fn names(ranked: &[SectionCount]) -> Vec<&str> {
        ranked.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_rank_keeps_top_five_descending() {
        let samples = vec![
            sample("/a", 3),
            sample("/b", 9),
            sample("/c", 1),
            sample("/d", 7),
            sample("/e", 5),
            sample("/f", 8),
            sample("/g", 2),
        ];
        let ranked = rank_sections(samples, 5);
        assert_eq!(names(&ranked), vec!["/b", "/f", "/d", "/e", "/a"]);
        assert!(ranked.windows(2).all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn test_rank_returns_all_when_fewer_than_k() {
        let ranked = rank_sections(vec![sample("/x", 1), sample("/y", 4)], 5);
        assert_eq!(names(&ranked), vec!["/y", "/x"]);
    }

    #[test]
    fn test_rank_of_nothing_is_empty() {
        assert!(rank_sections(Vec::new(), 5).is_empty());
        assert!(rank_sections(vec![sample("/x", 1)], 0).is_empty());
    }

    #[test]
    fn test_ties_break_by_name() {
        let samples = vec![
            sample("/zeta", 4),
            sample("/alpha", 4),
            sample("/mid", 4),
            sample("/top", 10),
            sample("/beta", 4),
            sample("/gamma", 4),
            sample("/delta", 4),
        ];
        let ranked = rank_sections(samples, 5);
        assert_eq!(
            names(&ranked),
            vec!["/top", "/alpha", "/beta", "/delta", "/gamma"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_without_sections_is_no_traffic() {
        let site = Site::new("test").unwrap();
        let summary = TopNReporter::default().summarize(&site).unwrap();
        assert!(summary.is_no_traffic());
        assert_eq!(summary.class_counts.total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_of_shared_prefix() {
        let site = Site::new("test").unwrap();
        for _ in 0..15 {
            site.ingest(&LogRecord {
                path: "/api/x".to_string(),
                response_code: 200,
            });
        }
        for _ in 0..5 {
            site.ingest(&LogRecord {
                path: "/api/y".to_string(),
                response_code: 404,
            });
        }

        let summary = TopNReporter::default().summarize(&site).unwrap();
        assert_eq!(summary.ranked_sections, vec![sample("/api", 20)]);
        assert_eq!(summary.class_counts.success, 15);
        assert_eq!(summary.class_counts.client_error, 5);
        assert!(!summary.is_no_traffic());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_sections_still_ranked_with_zero() {
        let site = Site::new("test").unwrap();
        site.ingest(&LogRecord {
            path: "/old".to_string(),
            response_code: 200,
        });
        tokio::time::advance(Duration::from_secs(20)).await;

        let summary = TopNReporter::default().summarize(&site).unwrap();
        assert_eq!(summary.ranked_sections, vec![sample("/old", 0)]);
        assert!(!summary.is_no_traffic());
        assert_eq!(summary.class_counts.total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_emits_immediately_then_per_period() {
        let site = Arc::new(Site::new("test").unwrap());
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(summary_reporter_task(
            Arc::clone(&site),
            TopNReporter::default(),
            // shorter than the summary window so the next tick still sees the hit
            Duration::from_secs(5),
            tx,
            cancel.clone(),
        ));

        match rx.recv().await.unwrap() {
            TrafficEvent::PeriodicSummary(summary) => assert!(summary.is_no_traffic()),
            other => panic!("unexpected event {:?}", other),
        }

        site.ingest(&LogRecord {
            path: "/later/page".to_string(),
            response_code: 503,
        });

        match rx.recv().await.unwrap() {
            TrafficEvent::PeriodicSummary(summary) => {
                assert_eq!(summary.ranked_sections, vec![sample("/later", 1)]);
                assert_eq!(summary.class_counts.server_error, 1);
            }
            other => panic!("unexpected event {:?}", other),
        }

        cancel.cancel();
        handle.await.unwrap();
    }
}
