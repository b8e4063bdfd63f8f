//! Static route resolution module
//!
//! Expands static file configuration into concrete routes and orders them
//! so that the most specific route is tried first.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::pattern::RoutePattern;
use crate::config::StaticFileConfig;
use crate::logger;

/// One concrete static route backed by a single local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRouteConfig {
    pub pattern: RoutePattern,
    pub local_path: PathBuf,
    /// Entry-level CORS setting; `None` defers to the server-wide flag
    pub cors: Option<bool>,
    pub response_headers: HashMap<String, String>,
}

/// Expand static file configuration into one route per concrete file
pub fn resolve_static_routes(configs: &[StaticFileConfig]) -> Vec<StaticRouteConfig> {
    let mut routes = Vec::new();

    for config in configs {
        let (public_path, local_path, cors, response_headers) = match config {
            StaticFileConfig::File {
                public_path,
                local_path,
                cors,
                response_headers,
            }
            | StaticFileConfig::Folder {
                public_path,
                local_path,
                cors,
                response_headers,
            } => (public_path, local_path, *cors, response_headers),
        };

        let entries = match config {
            StaticFileConfig::File { .. } => vec![(public_path.clone(), PathBuf::from(local_path))],
            StaticFileConfig::Folder { .. } => expand_folder(public_path, Path::new(local_path)),
        };

        for (path, file) in entries {
            match RoutePattern::parse(&path) {
                Ok(pattern) => routes.push(StaticRouteConfig {
                    pattern,
                    local_path: file,
                    cors,
                    response_headers: response_headers.clone(),
                }),
                Err(e) => logger::log_warning(&format!(
                    "Skipping static route '{path}' for {}: {e}",
                    file.display()
                )),
            }
        }
    }

    routes
}

/// Order routes most specific first; ties keep declaration order
pub fn sort_static_routes(mut routes: Vec<StaticRouteConfig>) -> Vec<StaticRouteConfig> {
    // sort_by_key is stable
    routes.sort_by_key(|route| route.pattern.specificity());
    routes
}

/// List every file below `dir` as (public path, local file), sorted by relative path
fn expand_folder(public_path: &str, dir: &Path) -> Vec<(String, PathBuf)> {
    let prefix = public_path
        .strip_suffix('*')
        .unwrap_or(public_path)
        .trim_end_matches('/');

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                logger::log_warning(&format!(
                    "Failed to read static folder {}: {e}",
                    dir.display()
                ));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };

        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        files.push((format!("{prefix}/{relative}"), entry.path().to_path_buf()));
    }

    files
}
