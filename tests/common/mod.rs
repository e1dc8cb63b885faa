//! Integration test helpers for ai-bridge
//!
//! Each test gets a scratch workspace root and its own state file, so the
//! binary never touches the real config dir.

use assert_cmd::cargo::cargo_bin_cmd;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Sandbox {
    _temp: TempDir,
    pub root: PathBuf,
    pub state_file: PathBuf,
}

impl Sandbox {
    /// Creates `<tmp>/ws` as the root and points the state file at `<tmp>/state`.
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("ws");
        fs::create_dir(&root).unwrap();
        let state_file = temp.path().join("state").join("bridge_history.json");

        let sandbox = Self {
            _temp: temp,
            root,
            state_file,
        };
        sandbox.cmd().arg("root").arg(&sandbox.root).assert().success();
        sandbox
    }

    /// Scratch directory next to the root, outside of it.
    #[allow(unused)]
    pub fn outside(&self) -> PathBuf {
        self.root.parent().unwrap().to_path_buf()
    }

    /// `ai-bridge` with this sandbox's state file, run from the root.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("ai-bridge");
        cmd.current_dir(&self.root)
            .env("AI_BRIDGE_STATE_FILE", &self.state_file)
            .env_remove("AI_BRIDGE_RETENTION")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }

    /// Runs `sync --json` with `batch` on stdin and returns the parsed response.
    #[allow(unused)]
    pub fn sync_json(&self, batch: &serde_json::Value) -> serde_json::Value {
        let output = self
            .cmd()
            .args(["sync", "-", "--json"])
            .write_stdin(batch.to_string())
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).unwrap()
    }

    #[allow(unused)]
    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root.join(rel)).unwrap()
    }

    #[allow(unused)]
    pub fn write(&self, rel: &str, content: &str) {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[allow(unused)]
    pub fn transactions(&self) -> Vec<String> {
        list_dir_names(&self.root.join(".ai-bridge").join("transactions"))
    }
}

/// Sorted entry names of `dir`, empty if it does not exist.
#[allow(unused)]
pub fn list_dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// `{"files": [...]}` body from `(path, content)` pairs.
#[allow(unused)]
pub fn batch(files: &[(&str, &str)]) -> serde_json::Value {
    serde_json::json!({
        "files": files
            .iter()
            .map(|(path, content)| serde_json::json!({ "path": path, "content": content }))
            .collect::<Vec<_>>()
    })
}
