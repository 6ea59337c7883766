//! Route table watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{build_router, load_config};
use crate::config::schema::RoutingConfig;
use crate::observability::metrics;
use crate::routing::router::SharedRouter;

/// A watcher that monitors the route table file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RoutingConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated configurations.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RoutingConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Route table change detected, reloading...");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                metrics::record_reload(false);
                                tracing::error!(
                                    "Failed to reload routes: {}. Keeping current routes.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Route table watcher started");
        Ok(watcher)
    }
}

/// Rebuild and publish a router for every configuration received, until
/// the sender side closes. Returns the number of successful swaps.
pub async fn apply_updates(
    shared: Arc<SharedRouter>,
    mut updates: mpsc::UnboundedReceiver<RoutingConfig>,
) -> usize {
    let mut applied = 0;
    while let Some(config) = updates.recv().await {
        match build_router(&config) {
            Ok(router) => {
                shared.replace(router);
                metrics::record_reload(true);
                applied += 1;
            }
            Err(e) => {
                metrics::record_reload(false);
                tracing::error!(error = %e, "Rejected route table; keeping current routes");
            }
        }
    }
    applied
}
