//! High-traffic alerting with hysteresis on the two-minute request rate

use super::counter::CounterError;
use super::events::TrafficEvent;
use super::site::{Site, RATE_WINDOW};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Normal,
    Alerting,
}

/// Timing of the alert task
///
/// The first sample is taken as soon as `settle` has passed (t = 2s with the
/// defaults), then once every `period`.
#[derive(Debug, Clone, Copy)]
pub struct AlertSchedule {
    /// Delay before the first sample, so at least one bucket exists
    pub settle: Duration,
    pub period: Duration,
}

impl Default for AlertSchedule {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            period: Duration::from_secs(1),
        }
    }
}

/// Two-state machine over the average request rate.
///
/// Transitions need a strict crossing: above the threshold to raise, below it
/// to recover. A rate exactly equal to the threshold never changes state.
#[derive(Debug)]
pub struct AlertMonitor {
    threshold: u64,
    state: AlertState,
}

impl AlertMonitor {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            state: AlertState::Normal,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn evaluate(
        &mut self,
        average: f64,
        hit_count: u64,
        timestamp: DateTime<Utc>,
    ) -> Option<TrafficEvent> {
        let threshold = self.threshold as f64;
        match self.state {
            AlertState::Normal if average > threshold => {
                self.state = AlertState::Alerting;
                Some(TrafficEvent::AlertRaised { hit_count, timestamp })
            }
            AlertState::Alerting if average < threshold => {
                self.state = AlertState::Normal;
                Some(TrafficEvent::AlertRecovered { hit_count, timestamp })
            }
            _ => None,
        }
    }

    /// Read the site's two-minute rate and step the machine
    pub fn sample(&mut self, site: &Site) -> Result<Option<TrafficEvent>, CounterError> {
        let average = site.rate_average(RATE_WINDOW)?;
        let hit_count = site.rate_total(RATE_WINDOW)?;
        log::debug!("Rate over {:?}: {:.3}/s ({} hits)", RATE_WINDOW, average, hit_count);
        Ok(self.evaluate(average, hit_count, Utc::now()))
    }
}

/// Alert task: samples once per period after the settle delay, until cancelled.
pub async fn alert_monitor_task(
    site: Arc<Site>,
    mut monitor: AlertMonitor,
    schedule: AlertSchedule,
    events: mpsc::Sender<TrafficEvent>,
    cancel: CancellationToken,
) {
    log::info!(
        "Alert monitor started (threshold: {}/s, period: {:?})",
        monitor.threshold(),
        schedule.period
    );

    tokio::select! {
        _ = cancel.cancelled() => {
            log::info!("Alert monitor cancelled before first sample");
            return;
        }
        _ = sleep(schedule.settle) => {}
    }

    let mut timer = interval(schedule.period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if cancel.is_cancelled() {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = timer.tick() => {}
        }

        match monitor.sample(&site) {
            Ok(Some(event)) => {
                if let Err(e) = events.send(event).await {
                    log::error!("Alert monitor could not emit event: {}", e);
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => log::error!("Alert monitor failed to sample rate: {}", e),
        }
    }

    log::info!("Alert monitor stopped (state: {:?})", monitor.state());
}
