//! Durable record of the in-flight report task for each unit.
//!
//! The poll controller writes the latest status after every successful fetch
//! so a restarted client can pick the job back up. Absence of a record means
//! nothing is in flight.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::domain::TaskRunStatusResponse;
use crate::error::{ApiError, ApiResult};

/// Storage for the current in-flight task of a unit.
pub trait Checkpoint: Send + Sync {
    fn load(&self, unit_id: &str) -> ApiResult<Option<TaskRunStatusResponse>>;
    fn save(&self, unit_id: &str, status: &TaskRunStatusResponse) -> ApiResult<()>;
    fn clear(&self, unit_id: &str) -> ApiResult<()>;
}

/// Checkpoint key builders for consistent key formats.
pub mod keys {
    /// Current in-flight task run for a unit
    pub fn current_task_run(unit_id: &str) -> String {
        format!("currentTaskRun-{}", unit_id)
    }
}

/// One JSON file per unit under a directory.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    dir: PathBuf,
}

impl FileCheckpoint {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Bytes outside `[A-Za-z0-9-]` are written as `_xx` hex, so distinct
    /// unit ids always map to distinct file names.
    fn path_for(&self, unit_id: &str) -> PathBuf {
        let mut key = String::new();
        for byte in keys::current_task_run(unit_id).bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                key.push(char::from(byte));
            } else {
                key.push_str(&format!("_{:02x}", byte));
            }
        }
        self.dir.join(format!("{}.json", key))
    }
}

impl Checkpoint for FileCheckpoint {
    fn load(&self, unit_id: &str) -> ApiResult<Option<TaskRunStatusResponse>> {
        let path = self.path_for(unit_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ApiError::Checkpoint(format!("{}: {}", path.display(), e)))?;

        match serde_json::from_str(&content) {
            Ok(status) => Ok(Some(status)),
            Err(e) => {
                // A corrupt record cannot be resumed; treat it as absent
                warn!(path = %path.display(), error = %e, "Discarding unreadable checkpoint");
                Ok(None)
            }
        }
    }

    fn save(&self, unit_id: &str, status: &TaskRunStatusResponse) -> ApiResult<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| ApiError::Checkpoint(format!("{}: {}", self.dir.display(), e)))?;

        let path = self.path_for(unit_id);
        let content = serde_json::to_string_pretty(status)
            .map_err(|e| ApiError::Checkpoint(e.to_string()))?;
        std::fs::write(&path, content)
            .map_err(|e| ApiError::Checkpoint(format!("{}: {}", path.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, permissions)
                .map_err(|e| ApiError::Checkpoint(format!("{}: {}", path.display(), e)))?;
        }

        debug!(unit_id, transaction_id = %status.transaction_id, status = %status.status, "Checkpoint saved");
        Ok(())
    }

    fn clear(&self, unit_id: &str) -> ApiResult<()> {
        let path = self.path_for(unit_id);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(unit_id, "Checkpoint cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Checkpoint(format!("{}: {}", path.display(), e))),
        }
    }
}

/// In-memory checkpoint, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryCheckpoint {
    records: Mutex<HashMap<String, TaskRunStatusResponse>>,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Checkpoint for MemoryCheckpoint {
    fn load(&self, unit_id: &str) -> ApiResult<Option<TaskRunStatusResponse>> {
        Ok(self
            .records
            .lock()
            .get(&keys::current_task_run(unit_id))
            .cloned())
    }

    fn save(&self, unit_id: &str, status: &TaskRunStatusResponse) -> ApiResult<()> {
        self.records
            .lock()
            .insert(keys::current_task_run(unit_id), status.clone());
        Ok(())
    }

    fn clear(&self, unit_id: &str) -> ApiResult<()> {
        self.records.lock().remove(&keys::current_task_run(unit_id));
        Ok(())
    }
}
