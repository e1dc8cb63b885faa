use crate::bridge::Bridge;
use crate::config::Config;
use crate::error::Result;

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
pub struct RootArgs {
    /// Directory to use as the new workspace root
    pub path: PathBuf,
}

pub fn execute(args: RootArgs, config: &Config) -> Result<()> {
    let bridge = Bridge::open(config)?;
    let root = bridge.set_root(&args.path)?;

    println!("{:>12} {}", "Switched".green().bold(), root.display());
    Ok(())
}
