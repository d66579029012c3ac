//! Navigation: moving between views, now or after a delay.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Imperative "go to path" capability.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator that records every visited path; the last one is the current
/// location.
#[derive(Debug, Default)]
pub struct History {
    entries: Mutex<Vec<String>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// History starting at `path`.
    pub fn starting_at(path: impl Into<String>) -> Self {
        Self {
            entries: Mutex::new(vec![path.into()]),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.lock().last().cloned()
    }

    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        // A panic while pushing a path leaves nothing half-written.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Navigator for History {
    fn navigate(&self, path: &str) {
        tracing::debug!(path, "navigate");
        self.lock().push(path.to_string());
    }
}

/// A navigation that fires once after a delay.
///
/// Dropping the handle cancels it, so a redirect owned by a form that goes
/// away never lands on a view that no longer exists.
#[derive(Debug)]
pub struct ScheduledNavigation {
    path: String,
    handle: JoinHandle<()>,
    settled: bool,
}

impl ScheduledNavigation {
    /// Must be called from within a tokio runtime.
    pub fn schedule(navigator: Arc<dyn Navigator>, path: impl Into<String>, delay: Duration) -> Self {
        let path = path.into();
        let target = path.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(&target);
        });

        tracing::debug!(path = %path, delay_ms = delay.as_millis() as u64, "navigation scheduled");
        Self {
            path,
            handle,
            settled: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the navigation already happened (or was aborted).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the navigation to happen.
    pub async fn finished(&mut self) {
        if self.settled {
            return;
        }
        let result = (&mut self.handle).await;
        self.settled = true;
        if let Err(err) = result {
            if !err.is_cancelled() {
                tracing::warn!(error = %err, path = %self.path, "scheduled navigation failed");
            }
        }
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for ScheduledNavigation {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
