// Server module entry
// Bootstraps the dev server: listener, routes, watcher and accept loop

pub mod connection;
pub mod listener;
pub mod rebuild;
pub mod signal;
pub mod watch;

// `loop` is a keyword, hence server_loop
#[path = "loop.rs"]
pub mod server_loop;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::cache::CacheStore;
use crate::config::{AppState, Config, ConfigError};
use crate::invoke::FunctionInvoker;
use crate::logger;
use crate::routing::RouteRegistry;

pub use listener::bind_available;
pub use rebuild::{run_rebuild_loop, RouteSet};
pub use server_loop::start_server_loop;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind listener: {0}")]
    Io(#[from] std::io::Error),
}

/// A bound dev server with its routes mounted
pub struct DevServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<AppState>,
    routes: Arc<RouteSet>,
    watcher: Option<(RecommendedWatcher, tokio::sync::mpsc::UnboundedReceiver<std::path::PathBuf>)>,
}

/// Bind the listener and mount the initial routes
///
/// `${PORT}` in function environments is replaced with the port actually
/// bound. The source watcher is started here; changes are only processed once
/// the server runs.
pub fn start(config: Config, invoker: Arc<dyn FunctionInvoker>) -> Result<DevServer, ServerError> {
    let listener = bind_available(config.get_socket_addr()?)?;
    let local_addr = listener.local_addr()?;

    let registry = Arc::new(RouteRegistry::new(invoker));
    let routes = Arc::new(RouteSet::new(
        config.functions_for_port(local_addr.port()),
        config.static_files.clone(),
        config.http.enable_cors,
        Arc::clone(&registry),
        CacheStore::new(config.server.use_cache),
    ));
    routes.mount();

    logger::log_server_start(&local_addr, &config);

    let watcher = match watch::spawn_source_watcher(&routes.watch_paths()) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            logger::log_warning(&format!(
                "Source watching disabled, routes will not be rebuilt: {e}"
            ));
            None
        }
    };

    Ok(DevServer {
        listener,
        local_addr,
        state: Arc::new(AppState::new(config, registry)),
        routes,
        watcher,
    })
}

impl DevServer {
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub const fn routes(&self) -> &Arc<RouteSet> {
        &self.routes
    }

    /// Serve until Ctrl+C or SIGTERM; must run inside a `LocalSet`
    pub async fn run(self) {
        self.run_until(signal::shutdown_signal()).await;
    }

    /// Serve until `shutdown` resolves; must run inside a `LocalSet`
    pub async fn run_until<S>(self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        // The watcher handle must outlive the loop or events stop
        let _watcher = self.watcher.map(|(watcher, changes)| {
            tokio::task::spawn_local(run_rebuild_loop(changes, Arc::clone(&self.routes)));
            watcher
        });

        start_server_loop(self.listener, self.state, shutdown).await;
    }
}
