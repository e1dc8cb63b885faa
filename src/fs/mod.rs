//! File system side of the bridge.
//!
//! Path sandboxing, the on-disk transaction store and its background
//! pruning worker.

pub mod prune;
pub mod resolve;
pub mod transaction;

pub use prune::{LogSink, PruneJob, PruneSink, PruneWorker, Pruner};
pub use resolve::{ResolvedPath, resolve};
pub use transaction::{
    ManifestEntry, Operation, Transaction, TransactionId, TransactionState, TransactionStore,
};

/// Reserved directory under the workspace root holding bridge state.
pub const BRIDGE_DIR: &str = ".ai-bridge";

/// Default number of transactions kept per workspace.
pub const DEFAULT_RETENTION: usize = 50;
