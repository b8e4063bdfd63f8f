//! Logger module
//!
//! Provides logging utilities for the dev server including:
//! - Server lifecycle logging
//! - Access logging
//! - Cache and rebuild events
//! - Error and warning logging

pub mod writer;

use crate::config::Config;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{}", writer::timestamped(message)),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{}", writer::timestamped(message)),
    }
}

pub fn log_info(message: &str) {
    write_info(&format!("[INFO] {message}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info(&format!("Started DEV server: http://localhost:{}", addr.port()));
    if addr.port() != config.server.port {
        write_info(&format!(
            "Requested port {} was unavailable",
            config.server.port
        ));
    }
    write_info(&format!("Function routes: {}", config.functions.len()));
    write_info(&format!("Static file configs: {}", config.static_files.len()));
    write_info(&format!(
        "Result cache: {}",
        if config.server.use_cache { "enabled" } else { "disabled" }
    ));
    if let Some(threshold) = config.http.minimum_compression_size {
        write_info(&format!("Compression threshold: {threshold} bytes"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================");
}

/// Log one handled request
pub fn log_access(method: &str, url: &str, status: u16, elapsed: Duration) {
    write_info(&format!(
        "[ACCESS] {method} {url} {status} {:.1}ms",
        elapsed.as_secs_f64() * 1000.0
    ));
}

pub fn log_cache_initialized(local_path: &str) {
    log_info(&format!("Initialized DEV server cache for Lambda: {local_path}"));
}

pub fn log_cache_invalidated(local_path: &str) {
    log_info(&format!("Invalidated DEV server cache for Lambda: {local_path}"));
}

pub fn log_cache_hit(url: &str) {
    log_info(&format!("DEV server cache hit for Lambda request: {url}"));
}

pub fn log_routes_reregistered(count: usize) {
    log_info(&format!("Reregistered DEV server routes ({count} mounted)."));
}

/// Forward output produced by a function invocation
pub fn log_function_output(route: &str, output: &str) {
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        write_info(&format!("[LAMBDA {route}] {line}"));
    }
}
