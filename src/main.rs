use std::sync::Arc;

use lambda_dev_server::config::Config;
use lambda_dev_server::invoke::ProcessInvoker;
use lambda_dev_server::{logger, server};

/// Config file used when none is given, extension resolved by the loader
const DEFAULT_CONFIG: &str = "devserver";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Single-threaded: every connection runs on one LocalSet
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, async move {
        let invoker = Arc::new(ProcessInvoker::new(cfg.server.verbose));
        let dev_server = server::start(cfg, invoker)?;
        dev_server.run().await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
