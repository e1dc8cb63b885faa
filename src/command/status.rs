use crate::bridge::Bridge;
use crate::config::Config;
use crate::error::Result;
use crate::server::StatusResponse;

use clap::Parser;
use colored::Colorize;

#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {
    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: StatusArgs, config: &Config) -> Result<()> {
    let bridge = Bridge::open(config)?;
    let status = bridge.status();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&StatusResponse::from(status))?
        );
        return Ok(());
    }

    println!("{:>12} {}", "Root".green().bold(), status.current_root.display());
    if status.history.is_empty() {
        println!("{:>12} {}", "History".cyan().bold(), "(empty)".dimmed());
    } else {
        println!("{:>12}", "History".cyan().bold());
        for path in &status.history {
            println!("{:>12} {}", "•", path.display().to_string().dimmed());
        }
    }
    Ok(())
}
