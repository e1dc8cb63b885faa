use crate::bridge::Bridge;
use crate::config::Config;
use crate::error::Result;
use crate::server::RollbackResponse;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
pub struct RollbackArgs {
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: RollbackArgs, config: &Config) -> Result<()> {
    let bridge = Bridge::open(config)?;
    let report = bridge.rollback()?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&RollbackResponse::from(report))?
        );
    } else {
        report.print_summary();
    }
    Ok(())
}
