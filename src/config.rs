//! Monitor configuration from environment variables and command-line flags

use crate::source::ReadMode;
use std::env;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    MissingValue(String),
    InvalidValue { key: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingValue(flag) => write!(f, "{} requires a value", flag),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for the monitor binary
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Access log to read
    pub log_file: PathBuf,

    /// Average requests per second over the rate window that raises an alert
    pub rate_threshold: u64,

    /// Per-section alert cap. Accepted for compatibility, no alert uses it.
    pub section_alert_max: u64,

    /// Capacity of the record and event channels
    pub channel_buffer: usize,

    pub read_mode: ReadMode,

    /// Also write every event to this JSONL file
    pub jsonl_path: Option<PathBuf>,

    pub site_name: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("/var/log/access.log"),
            rate_threshold: 10,
            section_alert_max: 10,
            channel_buffer: 10_000,
            read_mode: ReadMode::Follow,
            jsonl_path: None,
            site_name: "DataDog".to_string(),
        }
    }
}

/// What the command line asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgsOutcome {
    Run,
    Help,
}

impl MonitorConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `LOGMON_FILE` (default: /var/log/access.log)
    /// - `LOGMON_RATE_THRESHOLD` (default: 10, must not be negative)
    /// - `LOGMON_SECTION_ALERT_MAX` (default: 10)
    /// - `LOGMON_CHANNEL_BUFFER` (default: 10000)
    /// - `LOGMON_READ_MODE` (follow | tail | replay, default: follow)
    /// - `LOGMON_JSONL_PATH` (optional)
    /// - `LOGMON_SITE_NAME` (default: DataDog)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(file) = lookup("LOGMON_FILE") {
            config.log_file = PathBuf::from(file);
        }
        if let Some(value) = lookup("LOGMON_RATE_THRESHOLD") {
            config.rate_threshold = parse_threshold("LOGMON_RATE_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("LOGMON_SECTION_ALERT_MAX") {
            config.section_alert_max = parse_number("LOGMON_SECTION_ALERT_MAX", &value)?;
        }
        if let Some(value) = lookup("LOGMON_CHANNEL_BUFFER") {
            config.channel_buffer = parse_number("LOGMON_CHANNEL_BUFFER", &value)?;
            if config.channel_buffer == 0 {
                return Err(invalid("LOGMON_CHANNEL_BUFFER", &value));
            }
        }
        if let Some(value) = lookup("LOGMON_READ_MODE") {
            config.read_mode = ReadMode::from_str(value.trim())
                .ok_or_else(|| invalid("LOGMON_READ_MODE", &value))?;
        }
        config.jsonl_path = lookup("LOGMON_JSONL_PATH")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        if let Some(name) = lookup("LOGMON_SITE_NAME") {
            config.site_name = name;
        }

        Ok(config)
    }

    /// Override values with command-line flags. `args` excludes the program name.
    pub fn apply_args<I>(&mut self, args: I) -> Result<ArgsOutcome, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(ArgsOutcome::Help),
                "-f" | "--file" => {
                    let value = args.next().ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                    self.log_file = PathBuf::from(value);
                }
                "-r" | "--rate" => {
                    let value = args.next().ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                    self.rate_threshold = parse_threshold(&arg, &value)?;
                }
                "--replay" => self.read_mode = ReadMode::Replay,
                "--tail" => self.read_mode = ReadMode::FollowFromEnd,
                "--jsonl" => {
                    let value = args.next().ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                    self.jsonl_path = Some(PathBuf::from(value));
                }
                _ => return Err(invalid("argument", &arg)),
            }
        }
        Ok(ArgsOutcome::Run)
    }
}

pub fn usage() -> &'static str {
    "usage: logmon [-f <access log>] [-r <requests per second>] [--replay | --tail] [--jsonl <path>]\n\
     \n\
     \x20 -f, --file <path>   access log to monitor (LOGMON_FILE, default /var/log/access.log)\n\
     \x20 -r, --rate <n>      alert threshold in requests per second (LOGMON_RATE_THRESHOLD, default 10)\n\
     \x20     --replay        read the file once and exit at end of file\n\
     \x20     --tail          skip existing content, only watch appended lines\n\
     \x20     --jsonl <path>  also append every event to a JSONL file (LOGMON_JSONL_PATH)\n\
     \x20 -h, --help          show this message"
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Negative thresholds are rejected rather than wrapped or clamped.
fn parse_threshold(key: &str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<i64>() {
        Ok(n) if n >= 0 => Ok(n as u64),
        _ => Err(invalid(key, value)),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}
