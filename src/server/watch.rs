// Source watch module
// Turns filesystem events on function and static sources into changed paths

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::logger;

/// The set of source paths a watcher is responsible for
#[derive(Debug, Clone, Default)]
pub struct WatchSet {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl WatchSet {
    pub fn new(paths: &[PathBuf]) -> Self {
        let mut set = Self::default();
        for path in paths {
            let list = if path.is_dir() {
                &mut set.dirs
            } else {
                &mut set.files
            };
            if !list.contains(path) {
                list.push(path.clone());
            }
        }
        set
    }

    /// Whether a change at `path` concerns one of the sources
    pub fn covers(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f == path) || self.dirs.iter().any(|d| path.starts_with(d))
    }

    /// Paths to register and how
    ///
    /// Files are watched through their parent directory so that editors
    /// replacing the file by rename keep being observed.
    fn registrations(&self) -> Vec<(PathBuf, RecursiveMode)> {
        let mut out: Vec<(PathBuf, RecursiveMode)> = Vec::new();
        for dir in &self.dirs {
            out.push((dir.clone(), RecursiveMode::Recursive));
        }
        for file in &self.files {
            let Some(parent) = file.parent() else {
                continue;
            };
            if self.dirs.iter().any(|d| parent.starts_with(d))
                || out.iter().any(|(p, _)| p == parent)
            {
                continue;
            }
            out.push((parent.to_path_buf(), RecursiveMode::NonRecursive));
        }
        out
    }
}

/// Whether an event kind reflects a change of source content
pub const fn should_rebuild(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any)
    )
}

fn forward(event: notify::Result<Event>, set: &WatchSet, tx: &mpsc::UnboundedSender<PathBuf>) {
    match event {
        Ok(event) if should_rebuild(&event.kind) => {
            for path in event.paths.into_iter().filter(|p| set.covers(p)) {
                // The receiver is gone once the server stops
                let _ = tx.send(path);
            }
        }
        Ok(_) => {}
        Err(e) => logger::log_warning(&format!("Source watch error: {e}")),
    }
}

/// Start watching `paths` and return the stream of changed source paths
///
/// The watcher stops when the returned handle is dropped. Paths that cannot
/// be watched are logged and skipped.
pub fn spawn_source_watcher(
    paths: &[PathBuf],
) -> notify::Result<(RecommendedWatcher, mpsc::UnboundedReceiver<PathBuf>)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let set = WatchSet::new(paths);
    let registrations = set.registrations();

    let mut watcher = RecommendedWatcher::new(
        move |event| forward(event, &set, &tx),
        NotifyConfig::default(),
    )?;

    for (path, mode) in registrations {
        if let Err(e) = watcher.watch(&path, mode) {
            logger::log_warning(&format!("Cannot watch {}: {e}", path.display()));
        }
    }

    Ok((watcher, rx))
}
