//! Batch write of `(path, content)` pairs into the workspace.
//!
//! One transaction per batch. Each file is resolved, classified, recorded
//! and only then written. A failing file produces an `ERROR` result and the
//! batch moves on; files already written stay recorded and can be rolled
//! back.

use crate::error::{BridgeError, Result};
use crate::fs::{Operation, ResolvedPath, Transaction, TransactionId, TransactionStore, resolve};

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;

/// One file of an incoming batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRequest {
    pub path: String,
    pub content: String,
}

impl FileRequest {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileStatus {
    Created,
    Modified,
    Error,
}

impl From<Operation> for FileStatus {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Created => FileStatus::Created,
            Operation::Modified => FileStatus::Modified,
        }
    }
}

/// Outcome for one requested file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResult {
    pub path: String,
    pub status: FileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileResult {
    fn success(path: String, op: Operation) -> Self {
        Self {
            path,
            status: op.into(),
            error: None,
        }
    }

    fn failure(path: String, error: &BridgeError) -> Self {
        Self {
            path,
            status: FileStatus::Error,
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == FileStatus::Error
    }
}

/// Results of one batch, in request order.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub transaction_id: TransactionId,
    pub results: Vec<FileResult>,
}

impl SyncReport {
    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_error()).count()
    }

    /// Prints a per-file listing to stdout.
    pub fn print_summary(&self) {
        if self.results.is_empty() {
            println!("\n{}", "No files in batch".yellow());
            return;
        }

        println!(
            "\n{} {}",
            "Transaction".bold(),
            self.transaction_id.to_string().dimmed()
        );
        for result in &self.results {
            match result.status {
                FileStatus::Created => println!("   {} {}", "✨ CREATED ".magenta(), result.path),
                FileStatus::Modified => println!("   {} {}", "📝 MODIFIED".green(), result.path),
                FileStatus::Error => println!(
                    "   {} {} - {}",
                    "✖ ERROR   ".red(),
                    result.path,
                    result.error.as_deref().unwrap_or_default().dimmed()
                ),
            }
        }

        println!();
        let errors = self.error_count();
        if errors == 0 {
            println!(
                "{} Synced {} file{}",
                "✓".green().bold(),
                self.results.len(),
                if self.results.len() == 1 { "" } else { "s" }
            );
        } else {
            println!(
                "{} {} of {} file{} failed",
                "✗".red().bold(),
                errors,
                self.results.len(),
                if self.results.len() == 1 { "" } else { "s" }
            );
        }
    }
}

/// Writes `files` into the store's root under a single new transaction.
///
/// Only fails as a whole if the transaction itself cannot be created; every
/// per-file problem becomes an `ERROR` result.
///
/// A path that appears more than once in the batch keeps the classification
/// of its first occurrence, and only that occurrence is recorded. Rollback
/// therefore restores the state from before the batch, not an intermediate
/// one.
pub fn sync(store: &TransactionStore, files: &[FileRequest]) -> Result<SyncReport> {
    let tx = store.begin()?;
    log::info!(
        "[Sync] Started {} ({} file{})",
        tx.id(),
        files.len(),
        if files.len() == 1 { "" } else { "s" }
    );

    let mut first_seen: HashMap<String, Operation> = HashMap::new();
    let mut results = Vec::with_capacity(files.len());

    for file in files {
        match sync_one(store, &tx, file, &mut first_seen) {
            Ok((relative, op)) => {
                match op {
                    Operation::Created => log::info!("✨ {}: {}", "CREATED".magenta(), relative),
                    Operation::Modified => log::info!("📝 {}: {}", "MODIFIED".green(), relative),
                }
                results.push(FileResult::success(relative, op));
            }
            Err(e) => {
                log::error!("{}", format!("✖ ERROR: {} - {}", file.path, e).red());
                results.push(FileResult::failure(file.path.clone(), &e));
            }
        }
    }

    tx.seal();
    Ok(SyncReport {
        transaction_id: tx.id().clone(),
        results,
    })
}

fn sync_one(
    store: &TransactionStore,
    tx: &Transaction,
    file: &FileRequest,
    first_seen: &mut HashMap<String, Operation>,
) -> Result<(String, Operation)> {
    let resolved = resolve(&file.path, store.root())?;

    let op = match first_seen.get(&resolved.relative) {
        Some(op) => {
            log::debug!("{} already recorded in this batch", resolved.relative);
            *op
        }
        None => {
            let op = classify(&resolved)?;
            store.record(tx, &resolved.relative, op)?;
            first_seen.insert(resolved.relative.clone(), op);
            op
        }
    };

    write_content(&resolved, &file.content)?;
    Ok((resolved.relative, op))
}

/// CREATED if nothing is at the path, MODIFIED for an existing file.
fn classify(resolved: &ResolvedPath) -> Result<Operation> {
    match fs::metadata(&resolved.absolute) {
        Ok(meta) if meta.is_dir() => Err(BridgeError::write_failure(
            resolved.relative.as_str(),
            io::Error::new(io::ErrorKind::IsADirectory, "path is a directory"),
        )),
        Ok(_) => Ok(Operation::Modified),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Operation::Created),
        Err(e) => Err(BridgeError::write_failure(resolved.relative.as_str(), e)),
    }
}

fn write_content(resolved: &ResolvedPath, content: &str) -> Result<()> {
    if let Some(parent) = resolved.absolute.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| BridgeError::write_failure(resolved.relative.as_str(), e))?;
    }
    fs::write(&resolved.absolute, content)
        .map_err(|e| BridgeError::write_failure(resolved.relative.as_str(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::ManifestEntry;
    use tempfile::TempDir;

    #[test]
    fn test_sync_creates_new_file() {
        let temp = TempDir::new().unwrap();
        let store = TransactionStore::new(temp.path());

        let report = sync(&store, &[FileRequest::new("a/b.txt", "hello")]).unwrap();

        assert_eq!(
            report.results,
            vec![FileResult {
                path: "a/b.txt".into(),
                status: FileStatus::Created,
                error: None
            }]
        );
        assert_eq!(fs::read_to_string(temp.path().join("a/b.txt")).unwrap(), "hello");
    }

    #[test]
    fn test_sync_modifies_existing_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "old").unwrap();
        let store = TransactionStore::new(temp.path());

        let report = sync(&store, &[FileRequest::new("./a.txt", "new")]).unwrap();

        assert_eq!(report.results[0].status, FileStatus::Modified);
        assert_eq!(report.results[0].path, "a.txt");
        assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "new");

        let tx = store.most_recent().unwrap().unwrap();
        assert_eq!(fs::read_to_string(tx.backup_path("a.txt")).unwrap(), "old");
    }

    #[test]
    fn test_sync_partial_failure_continues() {
        let temp = TempDir::new().unwrap();
        let store = TransactionStore::new(temp.path());

        let report = sync(
            &store,
            &[
                FileRequest::new("one.txt", "1"),
                FileRequest::new("../escape.txt", "2"),
                FileRequest::new("three.txt", "3"),
            ],
        )
        .unwrap();

        let statuses: Vec<_> = report.results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![FileStatus::Created, FileStatus::Error, FileStatus::Created]
        );
        assert_eq!(report.results[1].path, "../escape.txt");
        assert!(
            report.results[1]
                .error
                .as_deref()
                .unwrap()
                .contains("Security Violation")
        );
        assert_eq!(fs::read_to_string(temp.path().join("one.txt")).unwrap(), "1");
        assert_eq!(fs::read_to_string(temp.path().join("three.txt")).unwrap(), "3");
        assert!(!temp.path().parent().unwrap().join("escape.txt").exists());
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn test_sync_empty_batch_still_opens_transaction() {
        let temp = TempDir::new().unwrap();
        let store = TransactionStore::new(temp.path());

        let report = sync(&store, &[]).unwrap();

        assert!(report.results.is_empty());
        assert_eq!(store.list().unwrap(), vec![report.transaction_id]);
    }

    #[test]
    fn test_sync_directory_target_is_error() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        let store = TransactionStore::new(temp.path());

        let report = sync(&store, &[FileRequest::new("src", "oops")]).unwrap();

        assert_eq!(report.results[0].status, FileStatus::Error);
        let tx = store.most_recent().unwrap().unwrap();
        assert!(tx.read_manifest().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_path_keeps_first_classification() {
        let temp = TempDir::new().unwrap();
        let store = TransactionStore::new(temp.path());

        let report = sync(
            &store,
            &[
                FileRequest::new("dup.txt", "first"),
                FileRequest::new("res://dup.txt", "second"),
            ],
        )
        .unwrap();

        assert_eq!(report.results[0].status, FileStatus::Created);
        assert_eq!(report.results[1].status, FileStatus::Created);
        assert_eq!(fs::read_to_string(temp.path().join("dup.txt")).unwrap(), "second");

        let tx = store.most_recent().unwrap().unwrap();
        assert_eq!(
            tx.read_manifest().unwrap(),
            vec![ManifestEntry {
                path: "dup.txt".into(),
                operation: Operation::Created
            }]
        );
        assert!(!tx.backup_path("dup.txt").exists());
    }

    #[test]
    fn test_write_failure_after_record_can_be_rolled_back() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("dir")).unwrap();
        fs::write(temp.path().join("dir/f.txt"), "C0").unwrap();
        let store = TransactionStore::new(temp.path());
        let tx = store.begin().unwrap();

        let resolved = resolve("dir/f.txt", store.root()).unwrap();
        let op = classify(&resolved).unwrap();
        assert_eq!(op, Operation::Modified);
        store.record(&tx, &resolved.relative, op).unwrap();

        // Parent turns into a regular file before the write lands.
        fs::remove_dir_all(temp.path().join("dir")).unwrap();
        fs::write(temp.path().join("dir"), "blocker").unwrap();

        let err = write_content(&resolved, "C1").unwrap_err();
        assert!(matches!(err, BridgeError::WriteFailure(ref path, _) if path == "dir/f.txt"));
        let result = FileResult::failure(resolved.relative.clone(), &err);
        assert_eq!(result.status, FileStatus::Error);
        assert!(result.error.unwrap().starts_with("Failed to write dir/f.txt"));
        tx.seal();

        fs::remove_file(temp.path().join("dir")).unwrap();
        let report = crate::steps::rollback(&store).unwrap();

        assert_eq!(report.restored_count, 1);
        assert_eq!(fs::read_to_string(temp.path().join("dir/f.txt")).unwrap(), "C0");
    }

    #[test]
    fn test_result_serialization() {
        let ok = FileResult::success("a.txt".into(), Operation::Created);
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({"path": "a.txt", "status": "CREATED"})
        );

        let err = FileResult::failure("b.txt".into(), &BridgeError::NoTransactions);
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!({"path": "b.txt", "status": "ERROR", "error": "No transactions found"})
        );
    }
}
