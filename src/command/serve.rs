use crate::bridge::Bridge;
use crate::config::Config;
use crate::error::Result;
use crate::server::{ServerConfig, run_server};

use clap::Parser;
use colored::Colorize;
use std::sync::Arc;

#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "AI_BRIDGE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, short = 'p', env = "AI_BRIDGE_PORT", default_value_t = 3000)]
    pub port: u16,
}

pub fn execute(args: ServeArgs, config: &Config) -> Result<()> {
    let bridge = Arc::new(Bridge::open(config)?);

    println!("{}", "=".repeat(50).cyan());
    println!(
        "{}",
        format!(" AI BRIDGE v{} ", crate::VERSION).bold().yellow()
    );
    println!("{}", "=".repeat(50).cyan());
    println!("Root: {}", bridge.status().current_root.display());
    println!("Keeping last {} transactions per workspace", config.retention);

    let server_config = ServerConfig {
        host: args.host,
        port: args.port,
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_server(Arc::clone(&bridge), server_config))?;

    bridge.flush_pruning();
    Ok(())
}
