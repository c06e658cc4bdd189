use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::engine::QueryResult;
use crate::model::RunMeta;

/// Fixed name of the single snapshot slot.
pub const SNAPSHOT_KEY: &str = "pivotdb.snapshot.json";

/// The sole persisted unit: last dataset, run metadata and result pair.
/// Written after every successful run or dataset load, read once at
/// startup. No versioning field; callers treat any parse mismatch as
/// "no snapshot".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<Dataset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_meta: Option<RunMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_result: Option<QueryResult>,
}

/// Injected persistence seam. Implementations are best-effort: `save`
/// swallows and logs failures, `load` answers `None` for anything it
/// cannot read or parse.
pub trait SnapshotStore {
    fn save(&self, payload: &SnapshotPayload);
    fn load(&self) -> Option<SnapshotPayload>;
}

/// One JSON file in a directory, always under [`SNAPSHOT_KEY`].
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SNAPSHOT_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, payload: &SnapshotPayload) {
        let text = match serde_json::to_string(payload) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!("failed to serialize snapshot: {}", err);
                return;
            }
        };
        if let Err(err) = fs::write(&self.path, text) {
            tracing::warn!("failed to write snapshot {}: {}", self.path.display(), err);
        }
    }

    fn load(&self) -> Option<SnapshotPayload> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!("no snapshot at {}: {}", self.path.display(), err);
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(payload) => Some(payload),
            Err(err) => {
                tracing::warn!("snapshot {} is unparseable: {}", self.path.display(), err);
                None
            }
        }
    }
}

/// In-memory test double holding the serialized slot.
#[derive(Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, payload: &SnapshotPayload) {
        match serde_json::to_string(payload) {
            Ok(text) => {
                if let Ok(mut slot) = self.slot.lock() {
                    *slot = Some(text);
                }
            }
            Err(err) => tracing::warn!("failed to serialize snapshot: {}", err),
        }
    }

    fn load(&self) -> Option<SnapshotPayload> {
        let slot = self.slot.lock().ok()?;
        let text = slot.as_deref()?;
        match serde_json::from_str(text) {
            Ok(payload) => Some(payload),
            Err(err) => {
                tracing::warn!("in-memory snapshot is unparseable: {}", err);
                None
            }
        }
    }
}
