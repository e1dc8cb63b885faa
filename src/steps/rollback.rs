//! Undo of the most recent sync batch.
//!
//! Replays the newest transaction's manifest last-entry-first: created
//! files are deleted, modified files get their backup copied back. The
//! transaction is then discarded, so each call reverts a different batch.

use crate::error::{BridgeError, Result};
use crate::fs::{ManifestEntry, Operation, Transaction, TransactionId, TransactionStore, resolve};

use colored::Colorize;
use std::fs;
use std::io;

/// Outcome of one rollback.
#[derive(Debug, Clone)]
pub struct RollbackReport {
    pub transaction_id: TransactionId,
    /// Entries actually deleted or restored.
    pub restored_count: usize,
    /// Entries that were skipped, with the reason.
    pub warnings: Vec<String>,
}

impl RollbackReport {
    pub fn print_summary(&self) {
        println!(
            "\n{} transaction {}",
            "Reverted".green().bold(),
            self.transaction_id.to_string().dimmed()
        );
        for warning in &self.warnings {
            println!("   {} {}", "⚠".yellow(), warning);
        }
        println!(
            "{} {} file{} restored",
            "✓".green().bold(),
            self.restored_count,
            if self.restored_count == 1 { "" } else { "s" }
        );
    }
}

enum EntryOutcome {
    Reverted,
    AlreadyAbsent,
}

/// Reverts the newest transaction under the store's root.
///
/// # Errors
///
/// - [`BridgeError::NoTransactions`] if there is nothing to revert
/// - [`BridgeError::CorruptManifest`] if the newest manifest is missing or
///   unparsable. That transaction is quarantined, so the next call reverts
///   the one before it.
///
/// A missing backup or a failed restore of one entry does not stop the
/// rollback; it is reported in [`RollbackReport::warnings`].
pub fn rollback(store: &TransactionStore) -> Result<RollbackReport> {
    let tx = store.most_recent()?.ok_or(BridgeError::NoTransactions)?;
    log::info!("{}", format!("[Rollback] Reverting transaction: {}", tx.id()).yellow());

    let manifest = match tx.read_manifest() {
        Ok(manifest) => manifest,
        Err(e) if is_corrupt_manifest(&e) => {
            log::error!("[Rollback] Unreadable manifest in {}: {}", tx.id(), e);
            store.quarantine(&tx)?;
            return Err(BridgeError::CorruptManifest(tx.id().to_string()));
        }
        Err(e) => return Err(e),
    };
    let mut restored_count = 0;
    let mut warnings = Vec::new();

    for entry in manifest.iter().rev() {
        match revert_entry(store, &tx, entry) {
            Ok(EntryOutcome::Reverted) => restored_count += 1,
            Ok(EntryOutcome::AlreadyAbsent) => {
                log::debug!("{} already absent", entry.path);
            }
            Err(e) => {
                log::error!("[Rollback] {}: {}", entry.path, e);
                warnings.push(e.to_string());
            }
        }
    }

    store.discard(&tx)?;
    log::info!(
        "{}",
        format!("[Rollback] Success. {} file(s) restored.", restored_count).green()
    );

    Ok(RollbackReport {
        transaction_id: tx.id().clone(),
        restored_count,
        warnings,
    })
}

/// Unparsable JSON or no manifest file at all. Other I/O errors may be
/// transient and leave the transaction alone.
fn is_corrupt_manifest(err: &BridgeError) -> bool {
    match err {
        BridgeError::Json(_) => true,
        BridgeError::Io(e) => e.kind() == io::ErrorKind::NotFound,
        _ => false,
    }
}

fn revert_entry(
    store: &TransactionStore,
    tx: &Transaction,
    entry: &ManifestEntry,
) -> Result<EntryOutcome> {
    // Manifests live on disk; the sandbox applies to them too.
    let target = resolve(&entry.path, store.root())?;

    match entry.operation {
        Operation::Created => match fs::remove_file(&target.absolute) {
            Ok(()) => {
                log::info!("Deleted {}", entry.path);
                Ok(EntryOutcome::Reverted)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(EntryOutcome::AlreadyAbsent),
            Err(e) => Err(BridgeError::write_failure(entry.path.as_str(), e)),
        },
        Operation::Modified => {
            let backup = tx.backup_path(&target.relative);
            if !backup.is_file() {
                return Err(BridgeError::CorruptBackup(entry.path.clone()));
            }

            if let Some(parent) = target.absolute.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| BridgeError::write_failure(entry.path.as_str(), e))?;
            }
            fs::copy(&backup, &target.absolute)
                .map_err(|e| BridgeError::write_failure(entry.path.as_str(), e))?;
            log::info!("Restored {}", entry.path);
            Ok(EntryOutcome::Reverted)
        }
    }
}
