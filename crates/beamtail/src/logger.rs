//! File-based logging using simplelog
//!
//! Log file location depends on build type:
//! - Debug builds: current working directory
//! - Release builds: cache directory (~/.cache/beamtail/ on Linux)
//!
//! Stdout carries the tail itself, so nothing is logged there.

use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;
use std::path::PathBuf;

fn log_file_path() -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let filename = format!("beamtail-{}.log", timestamp);

    if cfg!(debug_assertions) {
        PathBuf::from(filename)
    } else {
        beamtail_config::cache_dir()
            .map(|dir| dir.join(&filename))
            .unwrap_or_else(|_| PathBuf::from(filename))
    }
}

fn level_from_env() -> LevelFilter {
    std::env::var("RUST_LOG")
        .map(|v| parse_level(&v))
        .unwrap_or(LevelFilter::Debug)
}

fn parse_level(value: &str) -> LevelFilter {
    match value.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Initialize file-based logging
///
/// Returns the log file path, or `None` if the logger could not be set
/// up; the reason goes to stderr and beamtail runs without a log.
pub fn init() -> Option<PathBuf> {
    let log_file = log_file_path();

    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_time_offset_to_local()
        .unwrap_or_else(|c| c) // Fallback if local time offset fails
        .build();

    let file = match File::create(&log_file) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("beamtail: cannot create log file {}: {}", log_file.display(), e);
            return None;
        }
    };

    if let Err(e) = WriteLogger::init(level_from_env(), config, file) {
        eprintln!("beamtail: cannot initialize logger: {}", e);
        return None;
    }

    Some(log_file)
}
