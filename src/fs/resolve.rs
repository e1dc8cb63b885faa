//! Mapping of untrusted virtual paths onto the workspace root.
//!
//! This is the only place that decides whether a path may be touched.
//! Everything the sync engine writes goes through [`resolve`] first.
//!
//! ## Rules
//!
//! - `res://` maps to the root itself, `user://` to `user_data/`, applied in
//!   that order
//! - `file://`, leading separators and leading `./` are stripped
//! - Backslashes are treated as separators
//! - `.` and `..` are resolved lexically, *after* the steps above
//! - The result must lie strictly below the root
//! - The reserved `.ai-bridge` directory is never addressable, in any case
//! - Symlinks already on disk may not lead outside the root

use super::BRIDGE_DIR;
use crate::error::{BridgeError, Result};

use std::ffi::OsString;
use std::path::{Component, MAIN_SEPARATOR_STR, Path, PathBuf};

const RESOURCE_SCHEME: &str = "res://";
const USER_SCHEME: &str = "user://";
const USER_DATA_DIR: &str = "user_data/";
const FILE_SCHEME: &str = "file://";

/// A virtual path mapped into the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Absolute location on disk, always below the root.
    pub absolute: PathBuf,
    /// Path relative to the root with `/` separators.
    pub relative: String,
}

/// Resolves `virtual_path` against `root`.
///
/// # Errors
///
/// - [`BridgeError::InvalidPath`] if nothing is left after stripping schemes
///   and separators, or the input contains a NUL byte
/// - [`BridgeError::SecurityViolation`] if the normalized path is not strictly
///   inside `root`
pub fn resolve(virtual_path: &str, root: &Path) -> Result<ResolvedPath> {
    if virtual_path.contains('\0') {
        return Err(BridgeError::InvalidPath(
            virtual_path.to_string(),
            "contains NUL byte".to_string(),
        ));
    }

    let cleaned = strip_virtual_prefixes(virtual_path);
    if cleaned.is_empty() {
        return Err(BridgeError::InvalidPath(
            virtual_path.to_string(),
            "empty after normalization".to_string(),
        ));
    }

    let native = cleaned.replace('\\', MAIN_SEPARATOR_STR);
    let parts = normalize_components(Path::new(&native))
        .ok_or_else(|| BridgeError::SecurityViolation(cleaned.clone()))?;

    // Resolving to the root itself is not a file write target.
    let Some(first) = parts.first() else {
        return Err(BridgeError::SecurityViolation(cleaned));
    };
    if first
        .to_str()
        .is_some_and(|name| name.eq_ignore_ascii_case(BRIDGE_DIR))
    {
        return Err(BridgeError::SecurityViolation(cleaned));
    }

    let mut absolute = root.to_path_buf();
    absolute.extend(&parts);

    if !absolute.starts_with(root) || absolute == root {
        return Err(BridgeError::SecurityViolation(cleaned));
    }

    ensure_no_symlink_escape(root, &absolute, &cleaned)?;

    let relative = parts
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    log::trace!("Resolved '{}' -> {}", virtual_path, absolute.display());
    Ok(ResolvedPath { absolute, relative })
}

/// Strips scheme prefixes, leading separators and leading `./` segments.
fn strip_virtual_prefixes(raw: &str) -> String {
    let mut path = raw.trim().to_string();

    if let Some(rest) = path.strip_prefix(RESOURCE_SCHEME) {
        path = rest.to_string();
    }
    if let Some(rest) = path.strip_prefix(USER_SCHEME) {
        path = format!("{USER_DATA_DIR}{rest}");
    }
    if let Some(rest) = path.strip_prefix(FILE_SCHEME) {
        path = rest.to_string();
    }

    let mut rest = path.as_str();
    loop {
        let trimmed = rest.trim_start_matches(['/', '\\']);
        let trimmed = trimmed
            .strip_prefix("./")
            .or_else(|| trimmed.strip_prefix(".\\"))
            .unwrap_or(trimmed);
        if trimmed.len() == rest.len() {
            break;
        }
        rest = trimmed;
    }

    rest.to_string()
}

/// Lexically resolves `.` and `..`.
///
/// Returns `None` if the path climbs above its starting point or carries a
/// root or drive prefix of its own.
fn normalize_components(path: &Path) -> Option<Vec<OsString>> {
    let mut parts: Vec<OsString> = Vec::new();

    for component in path.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_os_string()),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(parts)
}

/// Rejects paths whose deepest existing ancestor resolves outside the root.
fn ensure_no_symlink_escape(root: &Path, absolute: &Path, display: &str) -> Result<()> {
    // A missing root surfaces later as a write failure.
    let Ok(canonical_root) = root.canonicalize() else {
        return Ok(());
    };

    let mut probe = absolute;
    loop {
        if probe.symlink_metadata().is_ok() {
            let canonical = probe
                .canonicalize()
                .map_err(|_| BridgeError::SecurityViolation(display.to_string()))?;
            if !canonical.starts_with(&canonical_root) {
                log::warn!(
                    "Symlink escape: {} resolves to {}",
                    absolute.display(),
                    canonical.display()
                );
                return Err(BridgeError::SecurityViolation(display.to_string()));
            }
            return Ok(());
        }

        match probe.parent() {
            Some(parent) if parent.starts_with(root) => probe = parent,
            _ => return Ok(()),
        }
    }
}
