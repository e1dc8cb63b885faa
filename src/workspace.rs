//! Workspace root registry.
//!
//! Holds the directory all syncs are confined to, plus a short list of
//! recently used roots. The record is persisted after every change so it
//! survives restarts, but persistence failures never block the process:
//! the in-memory state stays authoritative until exit.

use crate::error::{BridgeError, Result};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Maximum number of roots kept in history.
pub const MAX_HISTORY: usize = 10;

/// Shared handle to the registry, passed to every component that needs the root.
pub type WorkspaceHandle = Arc<RwLock<WorkspaceRegistry>>;

/// Persisted form of the registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceState {
    current_root: Option<PathBuf>,
    #[serde(default)]
    history: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct WorkspaceRegistry {
    state_file: Option<PathBuf>,
    current_root: PathBuf,
    history: Vec<PathBuf>,
}

impl WorkspaceRegistry {
    /// Loads the registry from `state_file`.
    ///
    /// Falls back to the process working directory when the file is missing,
    /// unreadable, or names a root that no longer exists.
    pub fn load(state_file: impl Into<PathBuf>) -> Self {
        let state_file = state_file.into();
        let fallback = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        let state = match fs::read_to_string(&state_file) {
            Ok(content) => serde_json::from_str::<WorkspaceState>(&content).unwrap_or_else(|e| {
                log::error!("Config load error: {}", e);
                WorkspaceState::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => WorkspaceState::default(),
            Err(e) => {
                log::error!("Config load error: {}", e);
                WorkspaceState::default()
            }
        };

        let current_root = match state.current_root {
            Some(root) if root.is_dir() => root,
            Some(root) => {
                log::warn!(
                    "Saved root {} no longer exists, using {}",
                    root.display(),
                    fallback.display()
                );
                fallback
            }
            None => fallback,
        };

        Self {
            state_file: Some(state_file),
            current_root,
            history: state.history,
        }
    }

    /// Registry that is never written to disk.
    pub fn in_memory(root: impl Into<PathBuf>) -> Self {
        Self {
            state_file: None,
            current_root: root.into(),
            history: Vec::new(),
        }
    }

    /// Wraps the registry in a shareable handle.
    pub fn into_handle(self) -> WorkspaceHandle {
        Arc::new(RwLock::new(self))
    }

    pub fn current_root(&self) -> &Path {
        &self.current_root
    }

    /// Previously used roots, most recent first.
    pub fn history(&self) -> &[PathBuf] {
        &self.history
    }

    pub fn state_file(&self) -> Option<&Path> {
        self.state_file.as_deref()
    }

    /// Switches the workspace root.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidRoot`] if `candidate` is not an existing
    /// directory. The previous root is kept.
    pub fn set_root(&mut self, candidate: impl AsRef<Path>) -> Result<PathBuf> {
        let candidate = candidate.as_ref();
        if !candidate.is_dir() {
            return Err(BridgeError::InvalidRoot(candidate.to_path_buf()));
        }

        let root = absolute_clean(candidate)?;
        self.current_root = root.clone();
        self.history.insert(0, root.clone());
        self.save();

        log::info!("Context switched to: {}", root.display());
        Ok(root)
    }

    /// Trims history and writes the record. Errors are logged, not returned.
    fn save(&mut self) {
        let mut seen = Vec::with_capacity(self.history.len());
        for path in self.history.drain(..) {
            if !seen.contains(&path) && path.exists() {
                seen.push(path);
            }
        }
        seen.truncate(MAX_HISTORY);
        self.history = seen;

        let Some(state_file) = &self.state_file else {
            return;
        };

        let state = WorkspaceState {
            current_root: Some(self.current_root.clone()),
            history: self.history.clone(),
        };

        let result = serde_json::to_string_pretty(&state)
            .map_err(BridgeError::from)
            .and_then(|json| {
                if let Some(parent) = state_file.parent()
                    && !parent.as_os_str().is_empty()
                {
                    fs::create_dir_all(parent)?;
                }
                fs::write(state_file, json)?;
                Ok(())
            });

        if let Err(e) = result {
            log::error!("Config save error: {}", e);
        }
    }
}

/// Absolute form of `path` with `.` and `..` resolved lexically.
fn absolute_clean(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut clean = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                clean.pop();
            }
            other => clean.push(other),
        }
    }
    Ok(clean)
}
