// Configuration module entry point
// Loads, validates and resolves the dev server configuration

mod state;
mod types;

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::routing::RoutePattern;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, FunctionRouteConfig, HttpConfig, LoggingConfig, RouteId, ServerConfig,
    StaticFileConfig, MAX_TIMEOUT_IN_SECONDS,
};

/// Placeholder in function environment values replaced by the bound port
pub const PORT_PLACEHOLDER: &str = "${PORT}";

/// Errors raised while resolving configuration, before any server starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error(
        "the timeout of function route {route} is {timeout}s, it must not exceed {max}s (the gateway integration timeout is 29s)",
        max = MAX_TIMEOUT_IN_SECONDS
    )]
    TimeoutTooLong { route: RouteId, timeout: u64 },

    #[error("invalid HTTP method '{method}' for function route {path}")]
    InvalidMethod { method: String, path: String },

    #[error("invalid public path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("function route {0} is declared more than once")]
    DuplicateRoute(RouteId),

    #[error("invalid listen address: {0}")]
    InvalidAddress(String),
}

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "devserver.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let settings = with_defaults(config::Config::builder())?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("DEV_SERVER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse configuration from TOML text, applying the same defaults as `load_from`
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings = with_defaults(config::Config::builder())?
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the gateway would refuse
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();

        for function in &self.functions {
            let route = function.route_id();

            if function.timeout_in_seconds > MAX_TIMEOUT_IN_SECONDS {
                return Err(ConfigError::TimeoutTooLong {
                    route,
                    timeout: function.timeout_in_seconds,
                });
            }

            if route.method != "ANY" && hyper::Method::from_bytes(route.method.as_bytes()).is_err()
            {
                return Err(ConfigError::InvalidMethod {
                    method: function.http_method.clone(),
                    path: function.public_path.clone(),
                });
            }

            check_pattern(&function.public_path)?;

            if !seen.insert(route.clone()) {
                return Err(ConfigError::DuplicateRoute(route));
            }
        }

        for static_file in &self.static_files {
            check_pattern(static_file.public_path())?;
        }

        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ConfigError::InvalidAddress(format!("{e}")))
    }

    /// Function routes with `${PORT}` in environment values replaced by `port`
    pub fn functions_for_port(&self, port: u16) -> Vec<FunctionRouteConfig> {
        let port = port.to_string();
        self.functions
            .iter()
            .cloned()
            .map(|mut function| {
                for value in function.environment.values_mut() {
                    if value.contains(PORT_PLACEHOLDER) {
                        *value = value.replace(PORT_PLACEHOLDER, &port);
                    }
                }
                function
            })
            .collect()
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 3000)?
        .set_default("server.use_cache", true)?
        .set_default("server.verbose", false)?
        .set_default("logging.access_log", true)?
        .set_default("http.enable_cors", false)?
        .set_default("http.max_body_size", 10_485_760) // 10MB
}

fn check_pattern(path: &str) -> Result<(), ConfigError> {
    RoutePattern::parse(path)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPath {
            path: path.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[server]
port = 4000

[[functions]]
http_method = "GET"
public_path = "/hello"
local_path = "dist/hello.js"
runtime = "node"
caching_enabled = true

[functions.environment]
api_url = "http://localhost:${PORT}/api"

[[static_files]]
type = "file"
public_path = "/"
local_path = "dist/index.html"

[[static_files]]
type = "folder"
public_path = "/assets/*"
local_path = "dist/assets"
cors = true
"#;

    #[test]
    fn test_from_toml_str_applies_defaults() {
        let cfg = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 4000);
        assert!(cfg.server.use_cache);
        assert!(!cfg.server.verbose);
        assert!(cfg.logging.access_log);
        assert!(!cfg.http.enable_cors);
        assert_eq!(cfg.http.minimum_compression_size, None);
        assert_eq!(cfg.http.max_body_size, 10_485_760);

        let hello = &cfg.functions[0];
        assert_eq!(hello.handler, "handler");
        assert_eq!(hello.timeout_in_seconds, MAX_TIMEOUT_IN_SECONDS);
        assert_eq!(hello.runtime.as_deref(), Some("node"));
        assert!(hello.caching_enabled);

        assert_eq!(cfg.static_files.len(), 2);
        assert!(matches!(
            cfg.static_files[1],
            StaticFileConfig::Folder {
                cors: Some(true),
                ..
            }
        ));
        assert!(matches!(
            cfg.static_files[0],
            StaticFileConfig::File { cors: None, .. }
        ));
    }

    #[test]
    fn test_timeout_above_ceiling_is_rejected() {
        let content = r#"
[[functions]]
http_method = "POST"
public_path = "/slow"
local_path = "slow.sh"
timeout_in_seconds = 30
"#;
        let err = Config::from_toml_str(content).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TimeoutTooLong { timeout: 30, .. }
        ));
        assert!(err.to_string().contains("POST /slow"));
    }

    #[test]
    fn test_invalid_method_is_rejected() {
        let content = r#"
[[functions]]
http_method = "GE T"
public_path = "/x"
local_path = "x.sh"
"#;
        assert!(matches!(
            Config::from_toml_str(content),
            Err(ConfigError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn test_duplicate_route_is_rejected() {
        let content = r#"
[[functions]]
http_method = "get"
public_path = "/x"
local_path = "a.sh"

[[functions]]
http_method = "GET"
public_path = "/x"
local_path = "b.sh"
"#;
        assert!(matches!(
            Config::from_toml_str(content),
            Err(ConfigError::DuplicateRoute(_))
        ));
    }

    #[test]
    fn test_relative_public_path_is_rejected() {
        let content = r#"
[[static_files]]
type = "file"
public_path = "index.html"
local_path = "dist/index.html"
"#;
        assert!(matches!(
            Config::from_toml_str(content),
            Err(ConfigError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_functions_for_port_substitutes_placeholder() {
        let cfg = Config::from_toml_str(SAMPLE).unwrap();
        let functions = cfg.functions_for_port(3456);
        assert_eq!(
            functions[0].environment.get("api_url").map(String::as_str),
            Some("http://localhost:3456/api")
        );
        // Base configuration is left untouched
        assert!(cfg.functions[0].environment["api_url"].contains(PORT_PLACEHOLDER));
    }

    #[test]
    fn test_function_route_deserializes_standalone() {
        let function: FunctionRouteConfig = toml::from_str(
            r#"
http_method = "delete"
public_path = "/items/{id}"
local_path = "items.py"
handler = "remove"
timeout_in_seconds = 5
"#,
        )
        .unwrap();
        assert_eq!(function.route_id().to_string(), "DELETE /items/{id}");
        assert_eq!(function.handler, "remove");
        assert!(!function.caching_enabled);
        assert!(function.environment.is_empty());
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");
        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert!(cfg.functions.is_empty());
        assert!(cfg.get_socket_addr().is_ok());
    }
}
