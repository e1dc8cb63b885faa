//! Sync and rollback executors.
//!
//! Both take a [`TransactionStore`](crate::fs::TransactionStore) bound to the
//! workspace root and do all their file system work through it.

pub mod rollback;
pub mod sync;

pub use rollback::{RollbackReport, rollback};
pub use sync::{FileRequest, FileResult, FileStatus, SyncReport, sync};
