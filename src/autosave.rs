//! Periodic dirty-overlay flush and crash-recovery snapshotting (spec
//! §4.L). Spawn/cancel convention grounded on `src/vfs_task.rs`'s
//! `spawn` -> `JoinHandle` pattern.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::vfs::Vfs;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub delay_seconds: u64,
    pub crash_recovery_interval_seconds: u64,
    pub recovery_path: String,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { delay_seconds: 10, crash_recovery_interval_seconds: 180, recovery_path: "./.vfsh/recovery.vfs".to_string() }
    }
}

/// Tracks when each overlay was last modified, so the tick task can tell
/// a dirty-but-fresh overlay from one that's actually gone quiet.
#[derive(Default)]
pub struct DirtyTracker {
    last_modified: std::collections::HashMap<usize, Instant>,
}

impl DirtyTracker {
    pub fn touch(&mut self, overlay_id: usize) {
        self.last_modified.insert(overlay_id, Instant::now());
    }

    fn quiet_for(&self, overlay_id: usize) -> Duration {
        self.last_modified.get(&overlay_id).map(|t| t.elapsed()).unwrap_or(Duration::MAX)
    }
}

pub struct Autosave {
    should_stop: Arc<AtomicBool>,
}

impl Autosave {
    /// Spawns the 1-second tick task. `vfs`/`tracker` are shared with the
    /// rest of the process behind a `tokio::sync::Mutex`, since the tick
    /// loop itself must stay async to use `tokio::time::interval`.
    pub fn spawn(vfs: Arc<Mutex<Vfs>>, tracker: Arc<Mutex<DirtyTracker>>, config: AutosaveConfig) -> (Self, JoinHandle<()>) {
        let should_stop = Arc::new(AtomicBool::new(false));
        let stop_flag = should_stop.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            let mut since_recovery = Duration::ZERO;
            loop {
                ticker.tick().await;
                if stop_flag.load(Ordering::Relaxed) {
                    break;
                }

                Self::flush_dirty(&vfs, &tracker, config.delay_seconds).await;

                since_recovery += Duration::from_secs(1);
                if since_recovery.as_secs() >= config.crash_recovery_interval_seconds {
                    since_recovery = Duration::ZERO;
                    Self::recover_snapshot(&vfs, &config.recovery_path).await;
                }
            }
        });
        (Self { should_stop }, handle)
    }

    pub fn stop(&self) {
        self.should_stop.store(true, Ordering::Relaxed);
    }

    async fn flush_dirty(vfs: &Arc<Mutex<Vfs>>, tracker: &Arc<Mutex<DirtyTracker>>, delay_seconds: u64) {
        let guard = vfs.lock().await;
        let tracker_guard = tracker.lock().await;
        let due: Vec<usize> = guard
            .overlays
            .ids()
            .filter(|&id| guard.overlays.is_dirty(id) && tracker_guard.quiet_for(id) >= Duration::from_secs(delay_seconds))
            .collect();
        drop(tracker_guard);
        drop(guard);

        for id in due {
            let mut guard = vfs.lock().await;
            let Some(source) = guard.overlays.source(id).cloned() else {
                guard.overlays.clear_dirty(id);
                continue;
            };
            match crate::snapshot::write_overlay(&guard, id, &source) {
                Ok(()) => guard.overlays.clear_dirty(id),
                Err(e) => tracing::warn!(overlay = id, error = %e, "autosave flush failed, will retry next tick"),
            }
        }
    }

    async fn recover_snapshot(vfs: &Arc<Mutex<Vfs>>, path: &str) {
        let guard = vfs.lock().await;
        if let Err(e) = crate::snapshot::write_overlay(&guard, 0, std::path::Path::new(path)) {
            tracing::warn!(error = %e, "crash-recovery snapshot failed, ignoring per §4.L");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirty_tracker_reports_quiet_duration() {
        let mut tracker = DirtyTracker::default();
        assert_eq!(tracker.quiet_for(0), Duration::MAX);
        tracker.touch(0);
        assert!(tracker.quiet_for(0) < Duration::from_secs(1));
    }
}
