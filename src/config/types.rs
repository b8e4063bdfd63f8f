// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Upper bound for a function timeout, one second below the gateway's
/// 29 second integration timeout.
pub const MAX_TIMEOUT_IN_SECONDS: u64 = 28;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub functions: Vec<FunctionRouteConfig>,
    #[serde(default)]
    pub static_files: Vec<StaticFileConfig>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    /// Requested port; another free port is used when it is taken
    pub port: u16,
    /// Server-wide switch for function result caching
    pub use_cache: bool,
    /// Forward function log output to the server log
    pub verbose: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub enable_cors: bool,
    /// Responses at least this large are gzipped; unset disables compression
    #[serde(default)]
    pub minimum_compression_size: Option<usize>,
    pub max_body_size: u64,
}

/// A function route: an HTTP method and path served by local function code
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FunctionRouteConfig {
    pub http_method: String,
    pub public_path: String,
    /// Executable (or script, see `runtime`) implementing the function
    pub local_path: String,
    /// Interpreter used to run `local_path`, e.g. `node` or `python3`
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default = "default_handler")]
    pub handler: String,
    #[serde(default = "default_timeout_in_seconds")]
    pub timeout_in_seconds: u64,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(default)]
    pub caching_enabled: bool,
}

fn default_handler() -> String {
    "handler".to_string()
}

const fn default_timeout_in_seconds() -> u64 {
    MAX_TIMEOUT_IN_SECONDS
}

impl FunctionRouteConfig {
    /// Stable identity of this route across configuration generations
    pub fn route_id(&self) -> RouteId {
        RouteId {
            method: self.http_method.to_ascii_uppercase(),
            path: self.public_path.clone(),
        }
    }
}

/// Identifies a function route by method and public path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId {
    pub method: String,
    pub path: String,
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Declarative static file configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StaticFileConfig {
    /// Serve one file under a path (which may end in `*`)
    File {
        public_path: String,
        local_path: String,
        #[serde(default)]
        cors: Option<bool>,
        #[serde(default)]
        response_headers: HashMap<String, String>,
    },
    /// Serve every file below a directory under a path prefix
    Folder {
        public_path: String,
        local_path: String,
        #[serde(default)]
        cors: Option<bool>,
        #[serde(default)]
        response_headers: HashMap<String, String>,
    },
}

impl StaticFileConfig {
    pub fn public_path(&self) -> &str {
        match self {
            Self::File { public_path, .. } | Self::Folder { public_path, .. } => public_path,
        }
    }

    pub fn local_path(&self) -> &str {
        match self {
            Self::File { local_path, .. } | Self::Folder { local_path, .. } => local_path,
        }
    }
}
