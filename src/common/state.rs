//! Replication state stores.
//!
//! The client publishes its durable frontier — the binlog `(file, position)`
//! a restart may resume from — through the [`ReplicaStateStore`] trait. The
//! frontier is only published at transaction boundaries (XID) and on log
//! rotation, so a store implementation may persist every publication without
//! write amplification concerns.
//!
//! Two implementations are provided:
//!
//! | Store | Use case |
//! |-------|----------|
//! | [`MemoryStateStore`] | Testing, callers that track position themselves |
//! | [`FileStateStore`]   | Single-node production (atomic JSON file) |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use crate::common::{RelayError, Result};

/// A resumable binlog position: log file name plus byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BinlogPosition {
    pub log_name: String,
    pub log_pos: u32,
}

impl BinlogPosition {
    pub fn new(log_name: impl Into<String>, log_pos: u32) -> Self {
        Self {
            log_name: log_name.into(),
            log_pos,
        }
    }
}

impl std::fmt::Display for BinlogPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.log_name, self.log_pos)
    }
}

/// External state adapter: persists the replication frontier and receives
/// liveness telemetry from the read loop.
///
/// The client calls `set_master_log_name_pos` only on XID and ROTATE events
/// (and once at bootstrap); that call is the durable frontier update. The
/// remaining methods are advisory telemetry and need not be persisted.
#[async_trait]
pub trait ReplicaStateStore: Send + Sync {
    /// Return the saved frontier, or `None` if nothing was ever saved.
    async fn load_master_info(&self) -> Result<Option<BinlogPosition>>;

    /// Durably persist the currently set frontier.
    async fn save_master_info(&self) -> Result<()>;

    /// Publish a new frontier.
    async fn set_master_log_name_pos(&self, name: &str, pos: u32) -> Result<()>;

    /// Advisory: timestamp and offset of the last event seen, for lag
    /// estimation.
    async fn set_last_event_time_pos(&self, when: u32, pos: u32);

    /// Advisory: the client is (re)connecting.
    async fn set_connecting(&self);

    /// Advisory: the client is processing an event (`true`) or blocked in a
    /// read (`false`).
    async fn set_state_processing(&self, processing: bool);
}

#[derive(Debug, Default)]
struct StateInner {
    position: Option<BinlogPosition>,
    last_event_when: u32,
    last_event_pos: u32,
    connect_attempts: u64,
    publish_count: u64,
    save_count: u64,
    processing: bool,
}

/// In-memory state store.
///
/// Keeps everything in process memory; `save_master_info` is a no-op. Also
/// exposes its counters, which makes it double as a spy in tests.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    inner: RwLock<StateInner>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start out with a known frontier, as if it had been saved before.
    pub fn with_position(position: BinlogPosition) -> Self {
        Self {
            inner: RwLock::new(StateInner {
                position: Some(position),
                ..Default::default()
            }),
        }
    }

    /// The current published frontier.
    pub async fn position(&self) -> Option<BinlogPosition> {
        self.inner.read().await.position.clone()
    }

    /// How many times the frontier was published.
    pub async fn publish_count(&self) -> u64 {
        self.inner.read().await.publish_count
    }

    /// How many times `save_master_info` was called.
    pub async fn save_count(&self) -> u64 {
        self.inner.read().await.save_count
    }

    /// How many connection attempts were reported.
    pub async fn connect_attempts(&self) -> u64 {
        self.inner.read().await.connect_attempts
    }

    /// Timestamp/offset of the last event seen.
    pub async fn last_event_time_pos(&self) -> (u32, u32) {
        let inner = self.inner.read().await;
        (inner.last_event_when, inner.last_event_pos)
    }
}

#[async_trait]
impl ReplicaStateStore for MemoryStateStore {
    async fn load_master_info(&self) -> Result<Option<BinlogPosition>> {
        Ok(self.inner.read().await.position.clone())
    }

    async fn save_master_info(&self) -> Result<()> {
        self.inner.write().await.save_count += 1;
        Ok(())
    }

    async fn set_master_log_name_pos(&self, name: &str, pos: u32) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.position = Some(BinlogPosition::new(name, pos));
        inner.publish_count += 1;
        Ok(())
    }

    async fn set_last_event_time_pos(&self, when: u32, pos: u32) {
        let mut inner = self.inner.write().await;
        inner.last_event_when = when;
        inner.last_event_pos = pos;
    }

    async fn set_connecting(&self) {
        self.inner.write().await.connect_attempts += 1;
    }

    async fn set_state_processing(&self, processing: bool) {
        self.inner.write().await.processing = processing;
    }
}

/// File-backed state store.
///
/// Persists the frontier as a small JSON document. Writes go through a
/// temporary file followed by a rename, so a crash mid-write leaves the
/// previous frontier intact.
pub struct FileStateStore {
    path: PathBuf,
    current: RwLock<Option<BinlogPosition>>,
}

impl FileStateStore {
    /// Create a store backed by `path`. The parent directory is created if
    /// missing; an existing file is loaded lazily on the first
    /// `load_master_info`.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    RelayError::state(format!("failed to create state directory: {}", e))
                })?;
            }
        }
        Ok(Self {
            path,
            current: RwLock::new(None),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_file(&self) -> Result<Option<BinlogPosition>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RelayError::state(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        let position: BinlogPosition = serde_json::from_slice(&data).map_err(|e| {
            RelayError::state(format!("corrupt state file {}: {}", self.path.display(), e))
        })?;
        Ok(Some(position))
    }

    async fn write_file(&self, position: &BinlogPosition) -> Result<()> {
        let data = serde_json::to_vec_pretty(position)
            .map_err(|e| RelayError::state(format!("failed to encode state: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &data).await.map_err(|e| {
            RelayError::state(format!("failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            RelayError::state(format!("failed to rename {}: {}", tmp.display(), e))
        })?;

        debug!(path = %self.path.display(), "persisted frontier {}", position);
        Ok(())
    }
}

#[async_trait]
impl ReplicaStateStore for FileStateStore {
    async fn load_master_info(&self) -> Result<Option<BinlogPosition>> {
        if let Some(position) = self.current.read().await.clone() {
            return Ok(Some(position));
        }
        let loaded = self.read_file().await?;
        if let Some(ref position) = loaded {
            *self.current.write().await = Some(position.clone());
        }
        Ok(loaded)
    }

    async fn save_master_info(&self) -> Result<()> {
        let current = self.current.read().await.clone();
        match current {
            Some(position) => self.write_file(&position).await,
            None => Err(RelayError::state("no frontier set, nothing to save")),
        }
    }

    async fn set_master_log_name_pos(&self, name: &str, pos: u32) -> Result<()> {
        let position = BinlogPosition::new(name, pos);
        *self.current.write().await = Some(position.clone());
        // Every publication is a transaction or rotate boundary; persist it.
        self.write_file(&position).await
    }

    async fn set_last_event_time_pos(&self, _when: u32, _pos: u32) {}

    async fn set_connecting(&self) {}

    async fn set_state_processing(&self, _processing: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStateStore::new();
        assert!(store.load_master_info().await.unwrap().is_none());

        store
            .set_master_log_name_pos("mysql-bin.000007", 1842)
            .await
            .unwrap();

        let loaded = store.load_master_info().await.unwrap().unwrap();
        assert_eq!(loaded, BinlogPosition::new("mysql-bin.000007", 1842));
        assert_eq!(store.publish_count().await, 1);
    }

    #[tokio::test]
    async fn test_memory_store_telemetry() {
        let store = MemoryStateStore::new();
        store.set_connecting().await;
        store.set_connecting().await;
        store.set_last_event_time_pos(1_700_000_000, 520).await;
        store.set_state_processing(true).await;

        assert_eq!(store.connect_attempts().await, 2);
        assert_eq!(store.last_event_time_pos().await, (1_700_000_000, 520));
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay-state.json");

        let store = FileStateStore::new(&path).await.unwrap();
        assert!(store.load_master_info().await.unwrap().is_none());

        store
            .set_master_log_name_pos("mysql-bin.000002", 4)
            .await
            .unwrap();

        // A fresh instance sees the frontier on disk.
        let reopened = FileStateStore::new(&path).await.unwrap();
        let loaded = reopened.load_master_info().await.unwrap().unwrap();
        assert_eq!(loaded, BinlogPosition::new("mysql-bin.000002", 4));
    }

    #[tokio::test]
    async fn test_file_store_save_without_frontier_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"))
            .await
            .unwrap();
        assert!(store.save_master_info().await.is_err());
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = FileStateStore::new(&path).await.unwrap();
        assert!(store.load_master_info().await.is_err());
    }

    #[test]
    fn test_position_display() {
        let pos = BinlogPosition::new("mysql-bin.000001", 4);
        assert_eq!(pos.to_string(), "mysql-bin.000001:4");
    }
}
