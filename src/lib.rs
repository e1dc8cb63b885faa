#![doc = include_str!("../README.md")]

pub mod bridge;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod fs;
pub mod server;
pub mod steps;
pub mod workspace;

pub use error::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() -> Result<()> {
    use clap::Parser;
    use command::BridgeCommand;

    let cli = cli::BridgeCli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.global.log_filter()),
    )
    .format_timestamp(None)
    .init();

    let config = cli.global.config();
    match cli.command {
        BridgeCommand::Serve(args) => command::serve::execute(args, &config),
        BridgeCommand::Status(args) => command::status::execute(args, &config),
        BridgeCommand::Root(args) => command::root::execute(args, &config),
        BridgeCommand::Sync(args) => command::sync::execute(args, &config),
        BridgeCommand::Rollback(args) => command::rollback::execute(args, &config),
    }
}
