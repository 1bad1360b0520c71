//! logmon - access-log traffic monitor
//!
//! Tails an HTTP access log, keeps windowed request statistics per site and
//! per section, raises a high-traffic alert with hysteresis, and prints a
//! ranked summary every ten seconds.

pub mod config;
pub mod monitor;
pub mod output;
pub mod source;
pub mod stats_core;
