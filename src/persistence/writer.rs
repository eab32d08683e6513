//! Atomic snapshot writes and the serialized write-behind worker

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, warn};

/// `<path>.tmp`, the staging file for an atomic replace
pub fn temp_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_owned();
    raw.push(".tmp");
    PathBuf::from(raw)
}

/// Write `bytes` to `<path>.tmp`, sync it, then rename over `path`
///
/// Readers of `path` observe either the previous file or the complete new
/// one, never a partial write.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp = temp_path(path);
    let staged = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        Ok::<_, std::io::Error>(())
    }
    .await;

    if let Err(e) = staged {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    tokio::fs::rename(&tmp, path).await?;
    debug!("Persisted {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

enum Job {
    Write(Vec<u8>),
    Flush(oneshot::Sender<()>),
}

/// Single background task that applies snapshot writes in order
///
/// Jobs queued while a write is in progress are coalesced: only the newest
/// snapshot is written, since each snapshot is the whole state.
pub(crate) struct WriteBehind {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
    tx: OnceLock<mpsc::UnboundedSender<Job>>,
}

impl WriteBehind {
    pub(crate) fn new(path: PathBuf, write_lock: Arc<Mutex<()>>) -> Self {
        Self {
            path,
            write_lock,
            tx: OnceLock::new(),
        }
    }

    /// Lazily start the worker on first use; must run inside a tokio runtime
    fn sender(&self) -> &mpsc::UnboundedSender<Job> {
        self.tx.get_or_init(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(run_worker(self.path.clone(), self.write_lock.clone(), rx));
            tx
        })
    }

    pub(crate) fn schedule(&self, bytes: Vec<u8>) {
        if self.sender().send(Job::Write(bytes)).is_err() {
            warn!("Write-behind worker for {:?} is gone, dropping snapshot", self.path);
        }
    }

    /// Resolve once every job queued before this call has been applied
    pub(crate) async fn flush(&self) {
        let Some(tx) = self.tx.get() else {
            return;
        };
        let (ack, done) = oneshot::channel();
        if tx.send(Job::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

async fn run_worker(
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
    mut rx: mpsc::UnboundedReceiver<Job>,
) {
    while let Some(job) = rx.recv().await {
        let mut latest = None;
        let mut acks = Vec::new();

        let mut absorb = |job: Job| match job {
            Job::Write(bytes) => latest = Some(bytes),
            Job::Flush(ack) => acks.push(ack),
        };
        absorb(job);
        while let Ok(next) = rx.try_recv() {
            absorb(next);
        }

        if let Some(bytes) = latest {
            let _guard = write_lock.lock().await;
            if let Err(e) = write_atomic(&path, &bytes).await {
                error!("Failed to persist snapshot to {:?}: {}", path, e);
            }
        }

        for ack in acks {
            let _ = ack.send(());
        }
    }
    debug!("Write-behind worker for {:?} stopped", path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temp_path_appends_suffix() {
        assert_eq!(
            temp_path(Path::new("/data/cache.json")),
            PathBuf::from("/data/cache.json.tmp")
        );
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("snapshot.json");

        write_atomic(&path, b"[1]").await.unwrap();
        write_atomic(&path, b"[1,2]").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"[1,2]");
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_write_behind_applies_latest_snapshot() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seen.json");
        let writer = WriteBehind::new(path.clone(), Arc::new(Mutex::new(())));

        writer.schedule(b"[\"a\"]".to_vec());
        writer.schedule(b"[\"b\",\"a\"]".to_vec());
        writer.flush().await;

        assert_eq!(std::fs::read(&path).unwrap(), b"[\"b\",\"a\"]");
    }

    #[tokio::test]
    async fn test_flush_without_jobs_returns() {
        let tmp = TempDir::new().unwrap();
        let writer = WriteBehind::new(tmp.path().join("x.json"), Arc::new(Mutex::new(())));
        writer.flush().await;
        assert!(!tmp.path().join("x.json").exists());
    }
}
