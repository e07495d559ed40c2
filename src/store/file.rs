//! JSON snapshot persistence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::pairing::MatchRecord;
use crate::core::postulation::{NewPostulation, Postulation};
use crate::core::types::{MatchId, PostulationId, Status};
use crate::store::memory::MemoryStore;
use crate::store::{
    AssignedDelta, CommitReceipt, MatchQuery, MatchStore, PostulationQuery, PostulationStore,
    StoreError, TransactionalStore, WriteBatch,
};

/// Snapshot format version for compatibility checking
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// Serializable store contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: String,
    pub created_at: String,
    #[serde(default)]
    pub postulations: Vec<Postulation>,
    #[serde(default)]
    pub matches: Vec<MatchRecord>,
}

impl StoreSnapshot {
    #[must_use]
    pub fn new(postulations: Vec<Postulation>, matches: Vec<MatchRecord>) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            postulations,
            matches,
        }
    }

    /// Load the embedded demo event
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded JSON does not parse.
    pub fn load_embedded() -> Result<Self, StoreError> {
        // Validated at compile time by build.rs
        const EMBEDDED_DEMO: &str = include_str!("../../data/demo_event.json");
        Self::from_json(EMBEDDED_DEMO)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// # Errors
    ///
    /// Returns an error if `json` is not a valid snapshot.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let snapshot: Self = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(
                expected = SNAPSHOT_VERSION,
                found = %snapshot.version,
                "Snapshot version mismatch"
            );
        }

        Ok(snapshot)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A [`MemoryStore`] mirrored to a JSON file.
///
/// The file is rewritten after every successful write through a temporary
/// file in the same directory followed by a rename, so a crash leaves either
/// the old or the new snapshot on disk. Writes and persistence happen under
/// one lock so snapshots land in commit order.
#[derive(Debug)]
pub struct FileStore {
    inner: MemoryStore,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the snapshot at `path`, or start empty if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let inner = if path.exists() {
            let snapshot = StoreSnapshot::load_from_file(&path)?;
            tracing::debug!(
                path = %path.display(),
                postulations = snapshot.postulations.len(),
                matches = snapshot.matches.len(),
                "Loaded snapshot"
            );
            MemoryStore::from_snapshot(snapshot)?
        } else {
            tracing::debug!(path = %path.display(), "No snapshot yet, starting empty");
            MemoryStore::new()
        };

        Ok(Self {
            inner,
            path,
            write_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory view backing this store
    #[must_use]
    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    /// Write the current contents to disk
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized or written.
    pub fn persist(&self) -> Result<(), StoreError> {
        let json = self.inner.snapshot()?.to_json()?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        tracing::debug!(path = %self.path.display(), "Snapshot written");
        Ok(())
    }

    /// Run a write against the in-memory store, then persist it.
    ///
    /// If the snapshot cannot be written the in-memory records are put back
    /// as they were before the write.
    fn write_through<T>(
        &self,
        op: impl FnOnce(&MemoryStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("snapshot lock poisoned".to_string()))?;
        let before = self.inner.snapshot()?;
        let result = op(&self.inner)?;

        if let Err(err) = self.persist() {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "Snapshot write failed, rolling back"
            );
            self.inner.restore(before)?;
            return Err(err);
        }
        Ok(result)
    }
}

#[async_trait]
impl PostulationStore for FileStore {
    async fn get_postulation(&self, id: &PostulationId) -> Result<Option<Postulation>, StoreError> {
        self.inner.get_postulation_now(id)
    }

    async fn query_postulations(
        &self,
        query: &PostulationQuery,
    ) -> Result<Vec<Postulation>, StoreError> {
        self.inner.query_postulations_now(query)
    }

    async fn create_postulation(&self, new: NewPostulation) -> Result<Postulation, StoreError> {
        self.write_through(|store| store.create_postulation_now(new))
    }

    async fn update_status(
        &self,
        id: &PostulationId,
        status: Status,
        observation: Option<String>,
    ) -> Result<Postulation, StoreError> {
        self.write_through(|store| store.update_status_now(id, status, observation))
    }

    async fn update_host_capacity(
        &self,
        id: &PostulationId,
        remaining: u32,
        assigned: AssignedDelta,
    ) -> Result<Postulation, StoreError> {
        self.write_through(|store| store.update_host_capacity_now(id, remaining, assigned))
    }
}

#[async_trait]
impl MatchStore for FileStore {
    async fn get_match(&self, id: &MatchId) -> Result<Option<MatchRecord>, StoreError> {
        self.inner.get_match_now(id)
    }

    async fn query_matches(&self, query: &MatchQuery) -> Result<Vec<MatchRecord>, StoreError> {
        self.inner.query_matches_now(query)
    }
}

#[async_trait]
impl TransactionalStore for FileStore {
    async fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        self.write_through(|store| store.commit_now(batch))
    }
}
