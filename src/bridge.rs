//! The four boundary operations: status, root change, sync, rollback.
//!
//! Transports (CLI, HTTP) talk to a [`Bridge`] and nothing else. It owns the
//! workspace handle and the prune worker, and serializes every mutating
//! operation so the root cannot change under an in-flight sync or rollback.

use crate::config::Config;
use crate::error::Result;
use crate::fs::{LogSink, PruneSink, PruneWorker, TransactionStore};
use crate::steps::{self, FileRequest, RollbackReport, SyncReport};
use crate::workspace::{WorkspaceHandle, WorkspaceRegistry};

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Snapshot of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub current_root: PathBuf,
    pub history: Vec<PathBuf>,
}

pub struct Bridge {
    workspace: WorkspaceHandle,
    worker: PruneWorker,
    retention: usize,
    op_lock: Mutex<()>,
}

impl Bridge {
    /// Opens the bridge described by `config`, loading the persisted registry.
    pub fn open(config: &Config) -> Result<Self> {
        let registry = WorkspaceRegistry::load(&config.state_file);
        log::debug!(
            "Loaded workspace registry from {} (root: {})",
            config.state_file.display(),
            registry.current_root().display()
        );
        Self::new(registry.into_handle(), config.retention)
    }

    /// Bridge over an existing handle, logging prune failures.
    pub fn new(workspace: WorkspaceHandle, retention: usize) -> Result<Self> {
        Self::with_sink(workspace, retention, Arc::new(LogSink))
    }

    /// Bridge reporting prune outcomes to `sink`.
    pub fn with_sink(
        workspace: WorkspaceHandle,
        retention: usize,
        sink: Arc<dyn PruneSink>,
    ) -> Result<Self> {
        Ok(Self {
            workspace,
            worker: PruneWorker::spawn(sink)?,
            retention: retention.max(1),
            op_lock: Mutex::new(()),
        })
    }

    pub fn workspace(&self) -> &WorkspaceHandle {
        &self.workspace
    }

    pub fn status(&self) -> Status {
        let registry = self.workspace.read().unwrap_or_else(PoisonError::into_inner);
        Status {
            current_root: registry.current_root().to_path_buf(),
            history: registry.history().to_vec(),
        }
    }

    /// Switches the workspace root. Waits for any running sync or rollback.
    pub fn set_root(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let _guard = self.op_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut registry = self.workspace.write().unwrap_or_else(PoisonError::into_inner);
        registry.set_root(path)
    }

    /// Applies `files` to the current root as one transaction.
    pub fn sync(&self, files: &[FileRequest]) -> Result<SyncReport> {
        let _guard = self.op_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let store = self.store();
        steps::sync(&store, files)
    }

    /// Reverts the most recent transaction under the current root.
    pub fn rollback(&self) -> Result<RollbackReport> {
        let _guard = self.op_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let store = self.store();
        steps::rollback(&store)
    }

    /// Blocks until background pruning has caught up.
    pub fn flush_pruning(&self) {
        self.worker.flush();
    }

    fn current_root(&self) -> PathBuf {
        self.workspace
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current_root()
            .to_path_buf()
    }

    fn store(&self) -> TransactionStore {
        TransactionStore::new(self.current_root())
            .with_retention(self.retention)
            .with_pruner(self.worker.pruner())
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("root", &self.current_root())
            .field("retention", &self.retention)
            .finish()
    }
}
