//! Response-code classes and their counters

use super::counter::{CounterError, CounterShape, WindowedCounter};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseClass {
    #[serde(rename = "2xx")]
    Success,
    #[serde(rename = "3xx")]
    Redirect,
    #[serde(rename = "4xx")]
    ClientError,
    #[serde(rename = "5xx")]
    ServerError,
}

impl ResponseClass {
    /// Classify an HTTP status. Anything outside 200..=599 has no class.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            200..=299 => Some(ResponseClass::Success),
            300..=399 => Some(ResponseClass::Redirect),
            400..=499 => Some(ResponseClass::ClientError),
            500..=599 => Some(ResponseClass::ServerError),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseClass::Success => "2xx",
            ResponseClass::Redirect => "3xx",
            ResponseClass::ClientError => "4xx",
            ResponseClass::ServerError => "5xx",
        }
    }

    pub fn all() -> [ResponseClass; 4] {
        [
            ResponseClass::Success,
            ResponseClass::Redirect,
            ResponseClass::ClientError,
            ResponseClass::ServerError,
        ]
    }
}

/// Point-in-time totals per response class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    #[serde(rename = "2xx")]
    pub success: u64,
    #[serde(rename = "3xx")]
    pub redirect: u64,
    #[serde(rename = "4xx")]
    pub client_error: u64,
    #[serde(rename = "5xx")]
    pub server_error: u64,
}

impl ClassCounts {
    pub fn get(&self, class: ResponseClass) -> u64 {
        match class {
            ResponseClass::Success => self.success,
            ResponseClass::Redirect => self.redirect,
            ResponseClass::ClientError => self.client_error,
            ResponseClass::ServerError => self.server_error,
        }
    }

    pub fn total(&self) -> u64 {
        self.success + self.redirect + self.client_error + self.server_error
    }
}

/// One windowed counter per response class
#[derive(Debug)]
pub struct ClassCounters {
    success: WindowedCounter,
    redirect: WindowedCounter,
    client_error: WindowedCounter,
    server_error: WindowedCounter,
}

impl ClassCounters {
    pub fn new(shape: CounterShape, origin: Instant) -> Self {
        Self {
            success: WindowedCounter::new(shape, origin),
            redirect: WindowedCounter::new(shape, origin),
            client_error: WindowedCounter::new(shape, origin),
            server_error: WindowedCounter::new(shape, origin),
        }
    }

    fn counter(&self, class: ResponseClass) -> &WindowedCounter {
        match class {
            ResponseClass::Success => &self.success,
            ResponseClass::Redirect => &self.redirect,
            ResponseClass::ClientError => &self.client_error,
            ResponseClass::ServerError => &self.server_error,
        }
    }

    pub fn record(&self, class: ResponseClass) {
        self.counter(class).add(1);
    }

    pub fn totals(&self, d: Duration) -> Result<ClassCounts, CounterError> {
        Ok(ClassCounts {
            success: self.success.total(d)?,
            redirect: self.redirect.total(d)?,
            client_error: self.client_error.total(d)?,
            server_error: self.server_error.total(d)?,
        })
    }
}
