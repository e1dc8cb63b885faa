//! Background worker that enforces transaction retention.
//!
//! `TransactionStore::begin` posts a [`PruneJob`] and returns immediately.
//! The worker thread runs jobs in order and reports the outcome to a
//! [`PruneSink`]. Nothing it does can fail a sync.

use super::transaction::{TransactionId, TransactionStore};
use crate::error::{BridgeError, Result};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Prune request for one workspace root.
#[derive(Debug, Clone)]
pub struct PruneJob {
    pub root: PathBuf,
    pub retention: usize,
}

impl PruneJob {
    pub fn new(root: PathBuf, retention: usize) -> Self {
        Self { root, retention }
    }

    /// Runs the job on the calling thread.
    pub fn run(&self) -> Result<Vec<TransactionId>> {
        TransactionStore::new(&self.root)
            .with_retention(self.retention)
            .prune()
    }
}

/// Receives prune outcomes.
pub trait PruneSink: Send + Sync {
    /// Called after a job removed at least one transaction.
    fn pruned(&self, _root: &Path, _removed: &[TransactionId]) {}

    /// Called when a job failed.
    fn failed(&self, root: &Path, error: &BridgeError);
}

/// Default sink: reports failures through `log`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl PruneSink for LogSink {
    fn pruned(&self, root: &Path, removed: &[TransactionId]) {
        log::debug!(
            "Pruned {} transaction(s) under {}",
            removed.len(),
            root.display()
        );
    }

    fn failed(&self, root: &Path, error: &BridgeError) {
        log::warn!("Cleanup failed for {}: {}", root.display(), error);
    }
}

enum PruneMsg {
    Run(PruneJob),
    Flush(Sender<()>),
    Shutdown,
}

/// Cloneable handle for posting jobs to a [`PruneWorker`].
#[derive(Clone)]
pub struct Pruner {
    tx: Sender<PruneMsg>,
}

impl Pruner {
    /// Queues `job`. Fails only if the worker has shut down.
    pub fn post(&self, job: PruneJob) -> Result<()> {
        self.tx
            .send(PruneMsg::Run(job))
            .map_err(|_| BridgeError::Other(anyhow::anyhow!("prune worker is not running")))
    }

    /// Blocks until every job posted before this call has run.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.tx.send(PruneMsg::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

/// Owner of the pruning thread. Dropping it drains the queue and joins.
pub struct PruneWorker {
    pruner: Pruner,
    handle: Option<JoinHandle<()>>,
}

impl PruneWorker {
    /// Spawns the worker thread.
    pub fn spawn(sink: Arc<dyn PruneSink>) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("ai-bridge-prune".into())
            .spawn(move || worker_loop(rx, sink))?;

        Ok(Self {
            pruner: Pruner { tx },
            handle: Some(handle),
        })
    }

    /// Handle for posting jobs.
    pub fn pruner(&self) -> Pruner {
        self.pruner.clone()
    }

    /// See [`Pruner::flush`].
    pub fn flush(&self) {
        self.pruner.flush();
    }
}

impl Drop for PruneWorker {
    fn drop(&mut self) {
        let _ = self.pruner.tx.send(PruneMsg::Shutdown);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("Prune worker panicked");
        }
    }
}

fn worker_loop(rx: Receiver<PruneMsg>, sink: Arc<dyn PruneSink>) {
    log::trace!("Prune worker started");
    while let Ok(msg) = rx.recv() {
        match msg {
            PruneMsg::Run(job) => match job.run() {
                Ok(removed) if removed.is_empty() => {}
                Ok(removed) => sink.pruned(&job.root, &removed),
                Err(e) => sink.failed(&job.root, &e),
            },
            PruneMsg::Flush(ack) => {
                let _ = ack.send(());
            }
            PruneMsg::Shutdown => break,
        }
    }
    log::trace!("Prune worker stopped");
}
