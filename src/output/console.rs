//! Colored console rendering of traffic events

use super::sink::{EventSink, SinkError};
use crate::stats_core::{ResponseClass, Summary, TrafficEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossterm::style::{Color, Stylize};
use std::io::Write;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct ConsoleSink<W: Write + Send> {
    out: W,
    threshold: u64,
    color: bool,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout(threshold: u64) -> Self {
        Self::new(std::io::stdout(), threshold, true)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, threshold: u64, color: bool) -> Self {
        Self {
            out,
            threshold,
            color,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: String, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text
        }
    }

    fn render(&self, event: &TrafficEvent) -> String {
        match event {
            TrafficEvent::AlertRaised { hit_count, timestamp } => self.paint(
                format!(
                    "\nHigh traffic generated an alert - hits = {}, triggered at {}\n\
                     (Above {} request per second over the past two minute interval)\n",
                    hit_count,
                    format_time(timestamp),
                    self.threshold
                ),
                Color::Red,
            ),
            TrafficEvent::AlertRecovered { hit_count, timestamp } => self.paint(
                format!(
                    "\nRECOVERY: from High traffic alert - hits = {}, recovered at {}\n",
                    hit_count,
                    format_time(timestamp)
                ),
                Color::Blue,
            ),
            TrafficEvent::PeriodicSummary(summary) => self.paint(render_summary(summary), Color::Green),
            TrafficEvent::AnomalyObserved { response_code } => self.paint(
                format!("found a weird response code: {}", response_code),
                Color::Yellow,
            ),
        }
    }
}

fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIME_FORMAT).to_string()
}

fn render_summary(summary: &Summary) -> String {
    let mut text = String::from("===Summary Statistics for Past 10 seconds of activity===\n");
    text.push_str("Top sections of the site past 10 seconds:\n");

    if summary.is_no_traffic() {
        text.push_str("-No traffic yet-\n");
    }
    for section in &summary.ranked_sections {
        text.push_str(&format!("{} : {}\n", section.name, section.count));
    }
    text.push_str("-------------------------------\n");

    let classes: Vec<String> = ResponseClass::all()
        .iter()
        .map(|class| format!("{}: {}", class.as_str(), summary.class_counts.get(*class)))
        .collect();
    text.push_str("\tResponse Codes:\n");
    text.push_str(&classes.join(", "));
    text
}

#[async_trait]
impl<W: Write + Send> EventSink for ConsoleSink<W> {
    async fn emit(&mut self, event: &TrafficEvent) -> Result<(), SinkError> {
        let text = self.render(event);
        writeln!(self.out, "{}", text)?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats_core::{ClassCounts, SectionCount};
    use chrono::TimeZone;

    async fn rendered(event: TrafficEvent) -> String {
        let mut sink = ConsoleSink::new(Vec::new(), 10, false);
        sink.emit(&event).await.unwrap();
        sink.flush().await.unwrap();
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[tokio::test]
    async fn test_alert_message() {
        let timestamp = Utc.with_ymd_and_hms(2018, 5, 9, 16, 0, 39).unwrap();
        let text = rendered(TrafficEvent::AlertRaised {
            hit_count: 1500,
            timestamp,
        })
        .await;
        assert!(text.contains("High traffic generated an alert - hits = 1500, triggered at 2018-05-09 16:00:39"));
        assert!(text.contains("(Above 10 request per second"));
    }

    #[tokio::test]
    async fn test_recovery_message() {
        let timestamp = Utc.with_ymd_and_hms(2018, 5, 9, 16, 2, 0).unwrap();
        let text = rendered(TrafficEvent::AlertRecovered {
            hit_count: 900,
            timestamp,
        })
        .await;
        assert!(text.contains("RECOVERY: from High traffic alert - hits = 900, recovered at 2018-05-09 16:02:00"));
    }

    #[tokio::test]
    async fn test_summary_lists_sections_and_codes() {
        let text = rendered(TrafficEvent::PeriodicSummary(Summary {
            ranked_sections: vec![
                SectionCount {
                    name: "/api".to_string(),
                    count: 20,
                },
                SectionCount {
                    name: "/report".to_string(),
                    count: 3,
                },
            ],
            class_counts: ClassCounts {
                success: 18,
                client_error: 5,
                ..Default::default()
            },
        }))
        .await;

        assert!(text.contains("/api : 20\n/report : 3\n"));
        assert!(text.contains("2xx: 18, 3xx: 0, 4xx: 5, 5xx: 0"));
        assert!(!text.contains("No traffic"));
    }

    #[tokio::test]
    async fn test_empty_summary_says_no_traffic() {
        let text = rendered(TrafficEvent::PeriodicSummary(Summary {
            ranked_sections: Vec::new(),
            class_counts: ClassCounts::default(),
        }))
        .await;
        assert!(text.contains("-No traffic yet-"));
    }

    #[tokio::test]
    async fn test_anomaly_message_with_color() {
        let mut sink = ConsoleSink::new(Vec::new(), 10, true);
        sink.emit(&TrafficEvent::AnomalyObserved { response_code: 999 })
            .await
            .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.contains("found a weird response code: 999"));
    }
}
