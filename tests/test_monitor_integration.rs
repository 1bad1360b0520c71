//! End-to-end tests: access log file in, traffic events out
//!
//! Runs the full monitor in replay mode against temporary log files and
//! checks the JSONL event log it leaves behind.

#[cfg(test)]
mod monitor_integration_tests {
    use logmon::config::MonitorConfig;
    use logmon::monitor::{run_monitor, MonitorError};
    use logmon::output::{EventSink, JsonlSink};
    use logmon::source::{LogRecord, ReadMode};
    use logmon::stats_core::{Site, TopNReporter, TrafficEvent};
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn clf(path: &str, code: i64) -> String {
        format!(
            "127.0.0.1 - james [09/May/2018:16:00:39 +0000] \"GET {} HTTP/1.0\" {} 123\n",
            path, code
        )
    }

    fn replay_config(log_file: PathBuf) -> MonitorConfig {
        MonitorConfig {
            log_file,
            read_mode: ReadMode::Replay,
            channel_buffer: 64,
            ..MonitorConfig::default()
        }
    }

    fn read_events(path: &Path) -> Vec<TrafficEvent> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_replay_reports_sections_and_codes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("access.log");
        let events_path = temp_dir.path().join("events.jsonl");

        let mut log = std::fs::File::create(&log_path).unwrap();
        for _ in 0..15 {
            log.write_all(clf("/api/x", 200).as_bytes()).unwrap();
        }
        for _ in 0..5 {
            log.write_all(clf("/api/y", 404).as_bytes()).unwrap();
        }
        log.write_all(b"this line is not a log record\n").unwrap();
        log.write_all(clf("/legacy/old", 999).as_bytes()).unwrap();
        drop(log);

        let sinks: Vec<Box<dyn EventSink>> =
            vec![Box::new(JsonlSink::open(events_path.clone()).unwrap())];
        let report = run_monitor(&replay_config(log_path), sinks, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.records_read, 21);
        assert_eq!(report.records_ingested, 21);

        let events = read_events(&events_path);
        assert_eq!(events.len() as u64, report.events_emitted);

        let anomalies: Vec<i64> = events
            .iter()
            .filter_map(|event| match event {
                TrafficEvent::AnomalyObserved { response_code } => Some(*response_code),
                _ => None,
            })
            .collect();
        assert_eq!(anomalies, vec![999]);

        // No alert: 21 hits over two minutes is far below 10 req/s
        assert!(!events
            .iter()
            .any(|event| matches!(event, TrafficEvent::AlertRaised { .. })));

        let summary = events
            .iter()
            .rev()
            .find_map(|event| match event {
                TrafficEvent::PeriodicSummary(summary) => Some(summary.clone()),
                _ => None,
            })
            .expect("replay ends with a summary");

        let ranked: Vec<(&str, u64)> = summary
            .ranked_sections
            .iter()
            .map(|section| (section.name.as_str(), section.count))
            .collect();
        assert_eq!(ranked, vec![("/api", 20), ("/legacy", 1)]);
        assert_eq!(summary.class_counts.success, 15);
        assert_eq!(summary.class_counts.client_error, 5);
        assert_eq!(summary.class_counts.total(), 20);
    }

    #[tokio::test]
    async fn test_empty_log_reports_no_traffic() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("access.log");
        let events_path = temp_dir.path().join("events.jsonl");
        std::fs::write(&log_path, b"").unwrap();

        let sinks: Vec<Box<dyn EventSink>> =
            vec![Box::new(JsonlSink::open(events_path.clone()).unwrap())];
        let report = run_monitor(&replay_config(log_path), sinks, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.records_ingested, 0);

        match read_events(&events_path).last() {
            Some(TrafficEvent::PeriodicSummary(summary)) => assert!(summary.is_no_traffic()),
            other => panic!("expected a final summary, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_log_file_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = replay_config(temp_dir.path().join("missing.log"));

        let result = run_monitor(&config, Vec::new(), CancellationToken::new()).await;
        assert!(matches!(result, Err(MonitorError::Source(_))));
    }

    #[tokio::test]
    async fn test_cancel_stops_following_monitor() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("access.log");
        std::fs::write(&log_path, clf("/api/x", 200)).unwrap();

        let config = MonitorConfig {
            log_file: log_path,
            read_mode: ReadMode::Follow,
            channel_buffer: 64,
            ..MonitorConfig::default()
        };
        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { run_monitor(&config, Vec::new(), cancel).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        cancel.cancel();

        let report = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("monitor stops after cancel")
            .unwrap()
            .unwrap();
        assert_eq!(report.records_ingested, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingest_and_summaries_lose_nothing() {
        let site = Arc::new(Site::new("concurrent").unwrap());
        let reporter = TopNReporter::default();

        let mut writers = Vec::new();
        for worker in 0..4 {
            let site = Arc::clone(&site);
            writers.push(tokio::spawn(async move {
                for i in 0..500 {
                    let record = LogRecord {
                        path: format!("/s{}/{}", (worker + i) % 7, i),
                        response_code: 200,
                    };
                    site.ingest(&record);
                    if i % 50 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }

        let reader_site = Arc::clone(&site);
        let summaries = tokio::spawn(async move {
            for _ in 0..20 {
                let summary = reporter.summarize(&reader_site).unwrap();
                assert!(summary.ranked_sections.len() <= 5);
                tokio::task::yield_now().await;
            }
        });

        for writer in writers {
            writer.await.unwrap();
        }
        summaries.await.unwrap();

        assert_eq!(site.section_count(), 7);
        assert_eq!(
            site.rate_total(std::time::Duration::from_secs(120)).unwrap(),
            2000
        );
    }
}
