//! On-disk transaction records with pre-image backups.
//!
//! Every sync batch opens exactly one transaction. Before a file is
//! overwritten, its old content is copied into the transaction and an entry
//! is appended to the manifest, so the batch can be reversed later.
//!
//! ## Layout
//!
//! ```text
//! <root>/.ai-bridge/transactions/
//!   2026-10-19T08-15-42-123456Z/
//!     manifest.json        [{"path": "a/b.txt", "type": "MODIFIED"}, ...]
//!     files/a/b.txt        pre-image of a/b.txt
//! ```
//!
//! ## Guarantees
//!
//! - **Ordering**: ids sort lexically in creation order
//! - **Backup first**: a MODIFIED entry is only appended once its backup exists
//! - **Serialized appends**: manifest read-modify-write holds the
//!   transaction's lock
//! - **Bounded history**: [`TransactionStore::prune`] keeps the newest
//!   `retention` transactions

use super::prune::{PruneJob, Pruner};
use super::{BRIDGE_DIR, DEFAULT_RETENTION};
use crate::error::{BridgeError, Result};

use chrono::{NaiveDateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

const TRANSACTIONS_DIR: &str = "transactions";
const MANIFEST_FILE: &str = "manifest.json";
const FILES_DIR: &str = "files";
const CORRUPT_SUFFIX: &str = ".corrupt";

/// `strftime` format of transaction ids. Fixed width, so lexical order is
/// chronological order.
const ID_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%6fZ";

/// What a sync did to a path, as recorded before doing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Path did not exist. Undone by deleting the file.
    Created,
    /// Path existed. Undone by restoring the backup.
    Modified,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Created => f.write_str("CREATED"),
            Operation::Modified => f.write_str("MODIFIED"),
        }
    }
}

/// One line of a transaction manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub operation: Operation,
}

/// Sortable transaction identifier derived from a UTC timestamp.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    fn from_timestamp(ts: NaiveDateTime) -> Self {
        Self(ts.format(ID_FORMAT).to_string())
    }

    /// Parses a directory name. Returns `None` for anything that is not a
    /// well-formed id, so foreign entries are never mistaken for transactions.
    pub fn parse(name: &str) -> Option<Self> {
        let ts = NaiveDateTime::parse_from_str(name, ID_FORMAT).ok()?;
        let id = Self::from_timestamp(ts);
        (id.0 == name).then_some(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.0, ID_FORMAT).ok()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Accepting `record` calls.
    Open,
    /// Batch finished; read-only.
    Sealed,
    /// Reverted and removed from disk.
    RolledBack,
    /// Removed from disk by retention pruning.
    Pruned,
}

/// Handle to one transaction directory.
///
/// The state lock doubles as the manifest lock: `record` holds it for the
/// whole read-modify-write.
#[must_use = "Transaction should be sealed once its batch is written"]
pub struct Transaction {
    id: TransactionId,
    dir: PathBuf,
    state: Mutex<TransactionState>,
}

impl Transaction {
    fn new(id: TransactionId, dir: PathBuf, state: TransactionState) -> Self {
        Self {
            id,
            dir,
            state: Mutex::new(state),
        }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Current state. A live handle whose directory has disappeared was pruned.
    pub fn state(&self) -> TransactionState {
        let state = *self.lock();
        match state {
            TransactionState::Open | TransactionState::Sealed if !self.dir.exists() => {
                TransactionState::Pruned
            }
            other => other,
        }
    }

    /// Stops accepting records.
    pub fn seal(&self) {
        let mut state = self.lock();
        if *state == TransactionState::Open {
            *state = TransactionState::Sealed;
            log::debug!("Sealed transaction {}", self.id);
        }
    }

    /// Location of the pre-image for `relative`.
    pub fn backup_path(&self, relative: &str) -> PathBuf {
        let mut path = self.dir.join(FILES_DIR);
        path.extend(relative.split('/'));
        path
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Reads the manifest in recorded order.
    pub fn read_manifest(&self) -> Result<Vec<ManifestEntry>> {
        read_manifest_file(&self.manifest_path())
    }

    fn lock(&self) -> MutexGuard<'_, TransactionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("dir", &self.dir)
            .finish()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        let state = *self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state == TransactionState::Open {
            log::debug!("Transaction {} dropped without seal", self.id);
        }
    }
}

/// Transaction records of one workspace root.
pub struct TransactionStore {
    root: PathBuf,
    dir: PathBuf,
    retention: usize,
    pruner: Option<Pruner>,
    last_issued: Mutex<Option<NaiveDateTime>>,
}

impl TransactionStore {
    /// Creates a store for `root` with the default retention and no
    /// background pruning.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let dir = root.join(BRIDGE_DIR).join(TRANSACTIONS_DIR);
        Self {
            root,
            dir,
            retention: DEFAULT_RETENTION,
            pruner: None,
            last_issued: Mutex::new(None),
        }
    }

    /// Sets how many transactions survive pruning. Clamped to at least 1.
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    /// Posts a prune job to `pruner` on every `begin()`.
    pub fn with_pruner(mut self, pruner: Pruner) -> Self {
        self.pruner = Some(pruner);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one subdirectory per transaction.
    pub fn transactions_dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Opens a new transaction with an empty manifest.
    ///
    /// Schedules pruning in the background if a pruner is attached. Failing
    /// to schedule it is logged and never fails the call.
    pub fn begin(&self) -> Result<Transaction> {
        let id = self.next_id()?;
        let dir = self.dir.join(id.as_str());

        fs::create_dir_all(&dir)?;
        write_manifest_file(&dir.join(MANIFEST_FILE), &[])?;
        log::debug!("Began transaction {}", id);

        if let Some(pruner) = &self.pruner {
            let job = PruneJob::new(self.root.clone(), self.retention);
            if let Err(e) = pruner.post(job) {
                log::error!("Cleanup failed: {}", e);
            }
        }

        Ok(Transaction::new(id, dir, TransactionState::Open))
    }

    /// Records that `relative` is about to be written.
    ///
    /// For [`Operation::Modified`] the live file is copied into the backup
    /// area first. Must run before the write; afterwards the backup would
    /// hold the new content.
    pub fn record(&self, tx: &Transaction, relative: &str, operation: Operation) -> Result<()> {
        let state = tx.lock();
        if *state != TransactionState::Open {
            return Err(BridgeError::Other(anyhow::anyhow!(
                "Transaction {} is not open",
                tx.id
            )));
        }

        if operation == Operation::Modified {
            let mut live = self.root.clone();
            live.extend(relative.split('/'));
            let backup = tx.backup_path(relative);

            if let Some(parent) = backup.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| BridgeError::write_failure(relative, e))?;
            }
            fs::copy(&live, &backup).map_err(|e| BridgeError::write_failure(relative, e))?;
            log::trace!("Backed up {} -> {}", live.display(), backup.display());
        }

        let manifest_path = tx.manifest_path();
        let mut manifest = read_manifest_file(&manifest_path)?;
        manifest.push(ManifestEntry {
            path: relative.to_string(),
            operation,
        });
        write_manifest_file(&manifest_path, &manifest)?;

        drop(state);
        Ok(())
    }

    /// Ids of all transactions on disk, oldest first.
    pub fn list(&self) -> Result<Vec<TransactionId>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            match name.to_str().and_then(TransactionId::parse) {
                Some(id) => ids.push(id),
                None => log::debug!("Ignoring foreign entry {:?} in {}", name, self.dir.display()),
            }
        }

        ids.sort();
        Ok(ids)
    }

    /// The transaction with the greatest id, if any.
    pub fn most_recent(&self) -> Result<Option<Transaction>> {
        Ok(self.list()?.pop().map(|id| {
            let dir = self.dir.join(id.as_str());
            Transaction::new(id, dir, TransactionState::Sealed)
        }))
    }

    /// Deletes the oldest transactions beyond the retention limit.
    ///
    /// Returns the removed ids. The newest transaction is never removed.
    pub fn prune(&self) -> Result<Vec<TransactionId>> {
        let ids = self.list()?;
        if ids.len() <= self.retention {
            return Ok(Vec::new());
        }

        let excess = ids.len() - self.retention;
        let doomed = &ids[..excess.min(ids.len() - 1)];

        log::info!("[Auto-Cleanup] Removing {} old backups...", doomed.len());
        for id in doomed {
            let dir = self.dir.join(id.as_str());
            match fs::remove_dir_all(&dir) {
                Ok(()) => {}
                // Already gone: a concurrent prune or rollback won the race.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(doomed.to_vec())
    }

    /// Removes the transaction from disk.
    pub fn discard(&self, tx: &Transaction) -> Result<()> {
        let mut state = tx.lock();
        if tx.dir.exists() {
            fs::remove_dir_all(&tx.dir)?;
        }
        *state = TransactionState::RolledBack;
        log::debug!("Discarded transaction {}", tx.id);
        Ok(())
    }

    /// Renames the transaction directory to `<id>.corrupt`.
    ///
    /// The new name is not a valid id, so [`list`](Self::list), rollback and
    /// pruning no longer see it. The directory is kept for inspection.
    pub fn quarantine(&self, tx: &Transaction) -> Result<PathBuf> {
        let mut state = tx.lock();
        let target = self.dir.join(format!("{}{}", tx.id, CORRUPT_SUFFIX));
        fs::rename(&tx.dir, &target)?;
        *state = TransactionState::RolledBack;
        log::warn!("Quarantined transaction {} to {}", tx.id, target.display());
        Ok(target)
    }

    /// Next id, strictly greater than any issued by this store or on disk.
    fn next_id(&self) -> Result<TransactionId> {
        let mut last = self
            .last_issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let on_disk = self.list()?.last().and_then(TransactionId::timestamp);
        let floor = match (*last, on_disk) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        let mut ts = Utc::now().naive_utc().trunc_subsecs(6);
        if let Some(floor) = floor
            && ts <= floor
        {
            ts = floor + TimeDelta::microseconds(1);
        }

        *last = Some(ts);
        Ok(TransactionId::from_timestamp(ts))
    }
}

fn read_manifest_file(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Writes the manifest through a temp file and rename.
fn write_manifest_file(path: &Path, entries: &[ManifestEntry]) -> Result<()> {
    let json = serde_json::to_string_pretty(entries)?;
    let tmp = path.with_extension("json.tmp");

    let mut file = fs::File::create(&tmp)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;
    Ok(())
}
