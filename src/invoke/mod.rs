//! Function invocation module
//!
//! Turns HTTP requests into gateway events, runs function code locally and
//! turns the result back into an HTTP response.

mod event;
mod handler;
mod process;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheEntry;
use crate::config::FunctionRouteConfig;

pub use event::{request_url, GatewayEvent, QueryValue};
pub use handler::handle_function_request;
pub use process::ProcessInvoker;

/// Why a function invocation produced no result
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("failed to start function '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("function I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("function exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("function returned no result")]
    MissingResult,

    #[error("function returned an invalid result: {0}")]
    InvalidResult(#[source] serde_json::Error),

    #[error("Task timed out after {:.2} seconds", .0.as_secs_f64())]
    Timeout(Duration),
}

/// The result object a function returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResult {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub body: Option<String>,
}

impl GatewayResult {
    /// Normalize into a cacheable response; non-string header values are stringified
    pub fn into_entry(self) -> CacheEntry {
        let mut headers: Vec<(String, String)> = self
            .headers
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (name, value)
            })
            .collect();
        headers.sort();

        CacheEntry {
            status_code: self.status_code,
            headers,
            body: self.body.unwrap_or_default(),
        }
    }
}

/// Executes function code for a route
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(
        &self,
        event: &GatewayEvent,
        config: &FunctionRouteConfig,
    ) -> Result<GatewayResult, InvocationError>;
}

/// Invocation bound for a route, `timeout_in_seconds * 1000` milliseconds
pub const fn invocation_timeout(config: &FunctionRouteConfig) -> Duration {
    Duration::from_millis(config.timeout_in_seconds.saturating_mul(1000))
}
