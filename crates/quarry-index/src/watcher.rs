//! Debounced filesystem watcher driving incremental passes.

use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use tokio::sync::mpsc;

use crate::engine::Engine;
use crate::error::{IndexError, Result};
use crate::languages::is_supported;

/// Watches the engine's root and re-runs an incremental pass after a burst
/// of changes settles. Shares the engine's reentrancy guard, so a watcher
/// pass never overlaps an explicit `index` call.
pub struct IndexWatcher {
    _handle: tokio::task::JoinHandle<()>,
}

impl IndexWatcher {
    /// # Errors
    ///
    /// Returns an error if the filesystem watcher cannot be initialized.
    pub fn start(engine: Arc<Engine>) -> Result<Self> {
        let (notify_tx, mut notify_rx) = mpsc::channel::<()>(8);

        let mut debouncer = new_debouncer(
            Duration::from_secs(1),
            move |events: std::result::Result<
                Vec<notify_debouncer_mini::DebouncedEvent>,
                notify::Error,
            >| {
                match events {
                    Ok(events) => {
                        let relevant = events
                            .iter()
                            .any(|e| e.kind == DebouncedEventKind::Any && is_supported(&e.path));
                        if relevant {
                            let _ = notify_tx.try_send(());
                        }
                    }
                    Err(e) => tracing::warn!("index watcher error: {e}"),
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(engine.root(), notify::RecursiveMode::Recursive)?;

        let handle = tokio::spawn(async move {
            let _debouncer = debouncer;
            while notify_rx.recv().await.is_some() {
                // Collapse signal bursts into one pass.
                while notify_rx.try_recv().is_ok() {}
                match engine.index(false).await {
                    Ok(report) => {
                        tracing::debug!(
                            changed = report.files_changed,
                            deleted = report.files_deleted,
                            "watcher pass complete"
                        );
                    }
                    Err(IndexError::PassInProgress) => {
                        tracing::debug!("watcher pass skipped, one already running");
                    }
                    Err(e) => tracing::warn!("watcher reindex failed: {e}"),
                }
            }
        });

        Ok(Self { _handle: handle })
    }
}
