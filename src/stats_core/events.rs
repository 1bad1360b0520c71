//! Events emitted by the stats core for presentation code to consume

use super::response::ClassCounts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A section and its sampled hit count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionCount {
    pub name: String,
    pub count: u64,
}

/// Periodic ranking of the busiest sections plus response-class totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub ranked_sections: Vec<SectionCount>,
    pub class_counts: ClassCounts,
}

impl Summary {
    /// No section has been seen yet. Every known section is ranked, so an
    /// empty ranking means an empty registry.
    pub fn is_no_traffic(&self) -> bool {
        self.ranked_sections.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum TrafficEvent {
    AlertRaised {
        hit_count: u64,
        timestamp: DateTime<Utc>,
    },
    AlertRecovered {
        hit_count: u64,
        timestamp: DateTime<Utc>,
    },
    PeriodicSummary(Summary),
    AnomalyObserved {
        response_code: i64,
    },
}

impl TrafficEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TrafficEvent::AlertRaised { .. } => "alert_raised",
            TrafficEvent::AlertRecovered { .. } => "alert_recovered",
            TrafficEvent::PeriodicSummary(_) => "periodic_summary",
            TrafficEvent::AnomalyObserved { .. } => "anomaly_observed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_serializes_with_event_tag() {
        let event = TrafficEvent::PeriodicSummary(Summary {
            ranked_sections: vec![SectionCount {
                name: "/api".to_string(),
                count: 20,
            }],
            class_counts: ClassCounts {
                success: 15,
                client_error: 5,
                ..Default::default()
            },
        });

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "PeriodicSummary");
        assert_eq!(json["ranked_sections"][0]["name"], "/api");
        assert_eq!(json["ranked_sections"][0]["count"], 20);
        assert_eq!(json["class_counts"]["4xx"], 5);
    }

    #[test]
    fn test_alert_parses_back_from_json() {
        let line = r#"{"event":"AlertRaised","hit_count":1500,"timestamp":"2024-05-09T16:00:39Z"}"#;
        let event: TrafficEvent = serde_json::from_str(line).unwrap();
        match event {
            TrafficEvent::AlertRaised { hit_count, timestamp } => {
                assert_eq!(hit_count, 1500);
                assert_eq!(timestamp.to_rfc3339(), "2024-05-09T16:00:39+00:00");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_empty_summary_means_no_traffic() {
        let summary = Summary {
            ranked_sections: Vec::new(),
            class_counts: ClassCounts::default(),
        };
        assert!(summary.is_no_traffic());
        assert_eq!(TrafficEvent::PeriodicSummary(summary).kind(), "periodic_summary");
    }
}
