//! Lazy single-flight snapshot loading and crash-safe saving
//!
//! One [`PersistenceManager`] owns one canonical JSON file. The first
//! caller of [`PersistenceManager::ensure_initialized`] reads it; callers
//! arriving while that read is in flight wait for the same load instead of
//! issuing their own. Missing, unreadable or malformed files load as the
//! snapshot's `Default`.
//!
//! Saves serialize the whole snapshot synchronously, then write it through
//! `<path>.tmp` and an atomic rename. Direct saves and write-behind saves
//! share one lock, so two writers never race on the temp file.

use crate::error::Result;
use crate::persistence::writer::{write_atomic, WriteBehind};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Load progress of a persisted cache
enum LoadState {
    Uninitialized,
    /// A load is in flight; waiters are woken through the `Notify`
    Loading(Arc<Notify>),
    Ready,
}

enum Role {
    Load(Arc<Notify>),
    Wait(Arc<Notify>),
}

pub struct PersistenceManager<S> {
    path: PathBuf,
    state: Mutex<LoadState>,
    disk_reads: AtomicUsize,
    write_lock: Arc<tokio::sync::Mutex<()>>,
    writer: WriteBehind,
    _snapshot: PhantomData<fn() -> S>,
}

impl<S> PersistenceManager<S>
where
    S: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let write_lock = Arc::new(tokio::sync::Mutex::new(()));
        Self {
            writer: WriteBehind::new(path.clone(), write_lock.clone()),
            path,
            state: Mutex::new(LoadState::Uninitialized),
            disk_reads: AtomicUsize::new(0),
            write_lock,
            _snapshot: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of times the canonical file has been read
    pub fn disk_reads(&self) -> usize {
        self.disk_reads.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.lock_state(), LoadState::Ready)
    }

    fn lock_state(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load the snapshot once and hand it to `hydrate`
    ///
    /// Only the caller that performs the load runs `hydrate`; everyone
    /// else returns after it has finished. If the loading task is dropped
    /// mid-flight the state falls back to uninitialized and a waiter takes
    /// over the load.
    pub async fn ensure_initialized<F, Fut>(&self, hydrate: F)
    where
        F: FnOnce(S) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut hydrate = Some(hydrate);

        loop {
            let role = {
                let mut state = self.lock_state();
                let role = match &*state {
                    LoadState::Ready => return,
                    LoadState::Loading(notify) => Role::Wait(notify.clone()),
                    LoadState::Uninitialized => Role::Load(Arc::new(Notify::new())),
                };
                if let Role::Load(notify) = &role {
                    *state = LoadState::Loading(notify.clone());
                }
                role
            };

            match role {
                Role::Wait(notify) => {
                    let notified = notify.notified();
                    tokio::pin!(notified);
                    notified.as_mut().enable();

                    // The load may have finished before we registered
                    if !matches!(*self.lock_state(), LoadState::Loading(_)) {
                        continue;
                    }
                    notified.await;
                }
                Role::Load(notify) => {
                    let guard = LoadGuard {
                        state: &self.state,
                        notify,
                        armed: true,
                    };

                    let snapshot = self.load().await;
                    if let Some(hydrate) = hydrate.take() {
                        hydrate(snapshot).await;
                    }

                    guard.complete();
                    info!("Initialized cache from {:?}", self.path);
                    return;
                }
            }
        }
    }

    /// Read and parse the canonical file; never fails
    pub async fn load(&self) -> S {
        self.disk_reads.fetch_add(1, Ordering::SeqCst);

        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<S>(&bytes) {
                Ok(snapshot) => {
                    debug!("Loaded snapshot from {:?} ({} bytes)", self.path, bytes.len());
                    snapshot
                }
                Err(e) => {
                    warn!("Malformed snapshot at {:?}, starting empty: {}", self.path, e);
                    S::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot at {:?}, starting empty", self.path);
                S::default()
            }
            Err(e) => {
                warn!("Failed to read snapshot at {:?}, starting empty: {}", self.path, e);
                S::default()
            }
        }
    }

    /// Write the whole snapshot now, propagating failures
    pub async fn try_persist(&self, snapshot: &S) -> Result<()> {
        let bytes = serde_json::to_vec(snapshot)?;
        let _guard = self.write_lock.lock().await;
        write_atomic(&self.path, &bytes).await
    }

    /// Write the whole snapshot now; failures are logged and swallowed
    pub async fn persist(&self, snapshot: &S) {
        if let Err(e) = self.try_persist(snapshot).await {
            warn!("Failed to persist {:?}, keeping in-memory state: {}", self.path, e);
        }
    }

    /// Queue the snapshot on the write-behind worker
    ///
    /// Serialization happens before returning, so the queued bytes reflect
    /// the state at the time of the call.
    pub fn schedule(&self, snapshot: &S) {
        match serde_json::to_vec(snapshot) {
            Ok(bytes) => self.writer.schedule(bytes),
            Err(e) => warn!("Failed to serialize snapshot for {:?}: {}", self.path, e),
        }
    }

    /// Wait for every queued write to reach the disk
    pub async fn flush(&self) {
        self.writer.flush().await;
    }
}

/// Resets an abandoned load so a waiter can retry it
struct LoadGuard<'a> {
    state: &'a Mutex<LoadState>,
    notify: Arc<Notify>,
    armed: bool,
}

impl LoadGuard<'_> {
    fn finish(&mut self, next: LoadState) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        *state = next;
        drop(state);
        self.notify.notify_waiters();
        self.armed = false;
    }

    fn complete(mut self) {
        self.finish(LoadState::Ready);
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Snapshot load was abandoned, resetting");
            self.finish(LoadState::Uninitialized);
        }
    }
}
