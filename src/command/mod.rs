pub mod rollback;
pub mod root;
pub mod serve;
pub mod status;
pub mod sync;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum BridgeCommand {
    /// Serve the bridge over HTTP for the browser userscript.
    Serve(serve::ServeArgs),
    /// Show the current workspace root and recently used roots.
    Status(status::StatusArgs),
    /// Switch the workspace root.
    Root(root::RootArgs),
    /// Write a batch of files into the workspace as one transaction.
    Sync(sync::SyncArgs),
    /// Undo the most recent sync.
    Rollback(rollback::RollbackArgs),
}
