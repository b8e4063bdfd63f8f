// Route rebuild module
// Remounts every route when a source changes

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::cache::CacheStore;
use crate::config::{FunctionRouteConfig, StaticFileConfig};
use crate::logger;
use crate::routing::{resolve_static_routes, sort_static_routes, RouteRegistry};

/// Absolute form of `path`, resolving symlinks when it exists
fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

/// Everything needed to (re)mount the route table
pub struct RouteSet {
    functions: Vec<Arc<FunctionRouteConfig>>,
    /// Normalized `local_path` of each function, same order as `functions`
    function_sources: Vec<PathBuf>,
    static_files: Vec<StaticFileConfig>,
    enable_cors: bool,
    registry: Arc<RouteRegistry>,
    caches: CacheStore,
}

impl RouteSet {
    pub fn new(
        functions: Vec<FunctionRouteConfig>,
        static_files: Vec<StaticFileConfig>,
        enable_cors: bool,
        registry: Arc<RouteRegistry>,
        caches: CacheStore,
    ) -> Self {
        let function_sources = functions
            .iter()
            .map(|f| normalize(Path::new(&f.local_path)))
            .collect();

        Self {
            functions: functions.into_iter().map(Arc::new).collect(),
            function_sources,
            static_files,
            enable_cors,
            registry,
            caches,
        }
    }

    pub const fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    pub const fn caches(&self) -> &CacheStore {
        &self.caches
    }

    /// Mount function routes, then static routes most specific first
    ///
    /// Returns the number of mounted routes.
    pub fn mount(&self) -> usize {
        for function in &self.functions {
            let cache = self.caches.cache_for(function);
            if let Err(e) = self
                .registry
                .register_function_route(Arc::clone(function), cache)
            {
                logger::log_error(&format!(
                    "Cannot mount {}: {e}",
                    function.route_id()
                ));
            }
        }

        for route in sort_static_routes(resolve_static_routes(&self.static_files)) {
            self.registry
                .register_static_route(Arc::new(route), self.enable_cors);
        }

        self.registry.len()
    }

    /// Rebuild the route table after `changed` was modified
    ///
    /// Caches of functions whose source is `changed` (or contains it) are
    /// reset before remounting.
    pub fn rebuild(&self, changed: &Path) {
        self.registry.remove_all_routes();

        let changed = normalize(changed);
        for (function, source) in self.functions.iter().zip(&self.function_sources) {
            if changed.starts_with(source) {
                self.caches.reset(function);
            }
        }

        let count = self.mount();
        logger::log_routes_reregistered(count);
    }

    /// Every source path a change should be reported for
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.function_sources.clone();
        for static_file in &self.static_files {
            let path = normalize(Path::new(static_file.local_path()));
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }
}

/// Rebuild once per reported change until the sender side closes
pub async fn run_rebuild_loop(mut changes: mpsc::UnboundedReceiver<PathBuf>, routes: Arc<RouteSet>) {
    while let Some(changed) = changes.recv().await {
        logger::log_info(&format!("Source changed: {}", changed.display()));
        routes.rebuild(&changed);
    }
}
