//! Access-log line → `LogRecord`
//!
//! Accepts Common Log Format lines and JSON lines. Anything else is rejected
//! and left for the caller to skip.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub path: String,
    pub response_code: i64,
}

#[derive(Debug)]
pub enum RecordError {
    Json(serde_json::Error),
    MissingRequest,
    MissingPath,
    MissingStatus,
    InvalidStatus(String),
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        RecordError::Json(err)
    }
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::Json(e) => write!(f, "JSON record error: {}", e),
            RecordError::MissingRequest => write!(f, "no quoted request line"),
            RecordError::MissingPath => write!(f, "request line has no path"),
            RecordError::MissingStatus => write!(f, "no status after request line"),
            RecordError::InvalidStatus(s) => write!(f, "invalid status code: {}", s),
        }
    }
}

impl std::error::Error for RecordError {}

impl LogRecord {
    /// Parse one line. A leading `{` means JSON, anything else is read as
    /// Common Log Format.
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let line = line.trim();
        if line.starts_with('{') {
            Self::from_jsonl(line)
        } else {
            Self::from_clf(line)
        }
    }

    pub fn from_jsonl(line: &str) -> Result<Self, RecordError> {
        Ok(serde_json::from_str(line)?)
    }

    /// `host ident user [date] "METHOD /path PROTO" status bytes`
    pub fn from_clf(line: &str) -> Result<Self, RecordError> {
        let open = line.find('"').ok_or(RecordError::MissingRequest)?;
        let rest = &line[open + 1..];
        let close = rest.find('"').ok_or(RecordError::MissingRequest)?;

        let request = &rest[..close];
        let mut parts = request.split_whitespace();
        let path = match (parts.next(), parts.next()) {
            (Some(_method), Some(path)) => path,
            _ => return Err(RecordError::MissingPath),
        };

        let status = rest[close + 1..]
            .split_whitespace()
            .next()
            .ok_or(RecordError::MissingStatus)?;
        let response_code = status
            .parse::<i64>()
            .map_err(|_| RecordError::InvalidStatus(status.to_string()))?;

        Ok(Self {
            path: path.to_string(),
            response_code,
        })
    }
}
