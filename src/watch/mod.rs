//! Config file watching
//!
//! Polls the provisioning document's modification time and calls back when
//! it changes. The first successful look at the file counts as a change, so
//! a watch always starts with a run.

use crate::error::Result;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Polls a file for modification
#[derive(Debug, Clone)]
pub struct ConfigWatcher {
    path: PathBuf,
    interval: Duration,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    /// Watch `path`, polling every `interval`
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
            last_modified: None,
        }
    }

    /// Watched path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Poll interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check whether the file changed since the last successful poll
    pub fn poll(&mut self) -> Result<bool> {
        let modified = std::fs::metadata(&self.path)?.modified()?;
        if self.last_modified == Some(modified) {
            return Ok(false);
        }
        self.last_modified = Some(modified);
        Ok(true)
    }

    /// Poll forever, running `on_change` after every change, until Ctrl-C
    ///
    /// The signal is only observed between polls; a run in progress always
    /// completes.
    pub async fn watch<F, Fut>(&mut self, on_change: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        };
        self.watch_until(on_change, shutdown).await;
    }

    /// Poll until `shutdown` completes
    pub async fn watch_until<F, Fut, S>(&mut self, mut on_change: F, shutdown: S)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
        S: Future<Output = ()>,
    {
        info!(
            path = %self.path.display(),
            interval_secs = self.interval.as_secs_f64(),
            "Watching config file"
        );
        tokio::pin!(shutdown);

        loop {
            match self.poll() {
                Ok(true) => {
                    info!(path = %self.path.display(), "Config file changed");
                    on_change().await;
                }
                Ok(false) => debug!("Config file unchanged"),
                Err(e) => warn!(path = %self.path.display(), "Failed to stat config file: {e}"),
            }

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                () = &mut shutdown => {
                    info!("Shutdown requested, stopping watch");
                    break;
                }
            }
        }
    }
}
