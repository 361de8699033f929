// src/store.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::{fs, sync::RwLock};

use crate::error::PersistenceError;
use crate::model::Snapshot;

pub const DEFAULT_DATA_FILE: &str = "stock_data.json";

/// On-disk home of the last successful snapshot. The poll loop is the only writer.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable state is an empty snapshot, never an error.
    pub async fn load(&self) -> Snapshot {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), "read snapshot: {e:#}");
                }
                return Snapshot::new();
            }
        };
        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snap) => snap.normalized(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "parse snapshot, starting empty: {e:#}");
                Snapshot::new()
            }
        }
    }

    /// Writes next to the target, then renames over it, so a crash mid-write
    /// leaves the previous file intact.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let body = serde_json::to_vec_pretty(snapshot)?;
        let io_err = |source: std::io::Error| PersistenceError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(io_err)?;
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, &body).await.map_err(io_err)?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_DATA_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotView {
    pub snapshot: Snapshot,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub failure_streak: u32,
}

/// Shared in-memory snapshot. The poll loop writes after each cycle; the
/// status surfaces only read.
#[derive(Debug, Clone, Default)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<SnapshotView>>,
}

impl SnapshotHandle {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SnapshotView {
                snapshot,
                ..SnapshotView::default()
            })),
        }
    }

    pub async fn read(&self) -> SnapshotView {
        self.inner.read().await.clone()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.snapshot.clone()
    }

    pub async fn replace(&self, snapshot: Snapshot, at: DateTime<Utc>) {
        let mut g = self.inner.write().await;
        g.snapshot = snapshot;
        g.refreshed_at = Some(at);
    }

    pub async fn set_failure_streak(&self, streak: u32) {
        self.inner.write().await.failure_streak = streak;
    }
}
