//! Runtime configuration shared by all subcommands.

use crate::fs::DEFAULT_RETENTION;

use std::path::PathBuf;

const APP_DIR: &str = "ai-bridge";
const STATE_FILE: &str = "bridge_history.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Where the workspace registry is persisted.
    pub state_file: PathBuf,
    /// Transactions kept per workspace.
    pub retention: usize,
}

impl Config {
    pub fn new(state_file: Option<PathBuf>, retention: usize) -> Self {
        Self {
            state_file: state_file.unwrap_or_else(default_state_file),
            retention: retention.max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, DEFAULT_RETENTION)
    }
}

/// `<config dir>/ai-bridge/bridge_history.json`, or the working directory
/// when the platform has no config dir.
pub fn default_state_file() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join(APP_DIR).join(STATE_FILE),
        None => PathBuf::from(format!(".{APP_DIR}-{STATE_FILE}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_state_file_wins() {
        let config = Config::new(Some(PathBuf::from("/tmp/state.json")), 5);
        assert_eq!(config.state_file, PathBuf::from("/tmp/state.json"));
        assert_eq!(config.retention, 5);
    }

    #[test]
    fn test_retention_floor() {
        assert_eq!(Config::new(None, 0).retention, 1);
    }

    #[test]
    fn test_default_state_file_name() {
        assert!(default_state_file().ends_with("bridge_history.json"));
    }
}
