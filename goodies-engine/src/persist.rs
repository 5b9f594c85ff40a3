//! # Snapshot persister
//!
//! Periodic and on-shutdown serialization of the storage blob to a file, and
//! restoration on startup. Grounded on
//! `original_source/goodies/persisted.go`'s `Persister` (ticker/stop
//! `select` loop, `cleanupOutdated` before every save, load-before-spawn at
//! construction) and the teacher's `start_expirer`-style background-task
//! pattern (`hkv-server/src/main.rs`).
//!
//! The encoding is `bincode` over a plain `HashMap<String, Entry>`; per
//! SPEC_FULL.md §4.3 the exact bytes are not part of the external contract,
//! only round-trip symmetry is.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::value::Entry;

/// Loads a snapshot from `filename` if present and decodable.
///
/// Absent or malformed files are not fatal: this returns an empty map and
/// logs a warning, matching "failure is not fatal" in SPEC_FULL.md §4.3.
pub fn load(filename: &Path) -> HashMap<String, Entry> {
    match std::fs::read(filename) {
        Ok(bytes) => match bincode::deserialize::<HashMap<String, Entry>>(&bytes) {
            Ok(map) => {
                tracing::info!(path = %filename.display(), entries = map.len(), "loaded snapshot");
                map
            }
            Err(err) => {
                tracing::warn!(path = %filename.display(), %err, "snapshot present but undecodable, starting empty");
                HashMap::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
        Err(err) => {
            tracing::warn!(path = %filename.display(), %err, "could not open snapshot, starting empty");
            HashMap::new()
        }
    }
}

/// Writes `map` to `filename` by encoding to a sibling `.tmp` file and
/// renaming it over the target, so a crash mid-write cannot leave a
/// truncated snapshot on the common path (SPEC_FULL.md §4.3 atomicity note).
fn save(filename: &Path, map: &HashMap<String, Entry>) -> std::io::Result<()> {
    let bytes = bincode::serialize(map)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    let tmp_path = tmp_path_for(filename);
    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, filename)
}

fn tmp_path_for(filename: &Path) -> PathBuf {
    let mut name = filename
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "goodies.dat".into());
    name.push(".tmp");
    filename.with_file_name(name)
}

/// Handle to a running persister background task.
///
/// Dropping this handle does not stop the task; call [`Persister::stop`] to
/// shut it down deterministically.
pub struct Persister {
    filename: PathBuf,
    shutdown_tx: Option<oneshot::Sender<oneshot::Sender<()>>>,
    task: Option<JoinHandle<()>>,
}

impl Persister {
    /// Spawns the background save loop for `store`, ticking every `interval`.
    /// `filename` must already have been used to construct `store` (via
    /// [`load`]) so the in-memory map starts from the persisted state.
    pub fn spawn(store: Arc<crate::store::Store>, filename: PathBuf, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<oneshot::Sender<()>>();
        let task_filename = filename.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        save_tick(&store, &task_filename);
                    }
                    done = &mut shutdown_rx => {
                        save_tick(&store, &task_filename);
                        if let Ok(ack) = done {
                            let _ = ack.send(());
                        }
                        return;
                    }
                }
            }
        });

        Persister {
            filename,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Triggers one final cleanup + save, then waits for the background task
    /// to exit. Synchronous with respect to the caller (SPEC_FULL.md §4.3).
    /// Calling this more than once is a logic error the type system
    /// prevents: the inner sender is consumed by the first call.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let (ack_tx, ack_rx) = oneshot::channel();
            if tx.send(ack_tx).is_ok() {
                let _ = ack_rx.await;
            }
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }
}

fn save_tick(store: &crate::store::Store, filename: &Path) {
    let map = store.snapshot_after_cleanup();
    if let Err(err) = save(filename, &map) {
        tracing::warn!(path = %filename.display(), %err, "backup not saved");
    } else {
        tracing::debug!(path = %filename.display(), entries = map.len(), "snapshot saved");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::value::Ttl;

    #[tokio::test]
    async fn persists_and_reloads_across_instances() {
        let dir = std::env::temp_dir().join(format!("goodies-persist-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("snap.dat");

        let store_a = Arc::new(Store::new(Duration::from_secs(30)));
        store_a.set("k", "v".into(), Ttl::Default);
        let mut persister = Persister::spawn(store_a.clone(), file.clone(), Duration::from_secs(3600));
        persister.stop().await;

        let map = load(&file);
        let store_b = Store::from_map(map, Duration::from_secs(30));
        assert_eq!(store_b.get("k").unwrap(), "v");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_missing_file_is_empty_not_fatal() {
        let map = load(Path::new("/nonexistent/goodies-snapshot-that-does-not-exist.dat"));
        assert!(map.is_empty());
    }

    #[test]
    fn load_malformed_file_is_empty_not_fatal() {
        let dir = std::env::temp_dir().join(format!("goodies-persist-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("bad.dat");
        std::fs::write(&file, b"not a valid bincode blob at all").unwrap();
        let map = load(&file);
        assert!(map.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}
