use crate::command::BridgeCommand;
use crate::config::Config;
use crate::fs::DEFAULT_RETENTION;

use clap::{ArgAction, Args, Parser};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ai-bridge", version, about, long_about = None)]
pub struct BridgeCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: BridgeCommand,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// File holding the current root and root history
    #[arg(long, value_name = "PATH", env = "AI_BRIDGE_STATE_FILE", global = true)]
    pub state_file: Option<PathBuf>,

    /// Number of transactions kept per workspace
    #[arg(
        long,
        value_name = "N",
        env = "AI_BRIDGE_RETENTION",
        default_value_t = DEFAULT_RETENTION,
        global = true
    )]
    pub retention: usize,

    /// More log output (-v debug, -vv trace)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl GlobalArgs {
    pub fn config(&self) -> Config {
        Config::new(self.state_file.clone(), self.retention)
    }

    /// Default `env_logger` filter for these flags. `RUST_LOG` still wins.
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}
