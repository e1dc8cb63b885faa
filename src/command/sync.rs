use crate::bridge::Bridge;
use crate::config::Config;
use crate::error::Result;
use crate::server::SyncResponse;
use crate::steps::FileRequest;

use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
pub struct SyncArgs {
    /// JSON batch to apply, or `-` for stdin
    ///
    /// Accepts either `{"files": [{"path": ..., "content": ...}]}` or the
    /// bare array.
    #[arg(value_name = "BATCH", default_value = "-", verbatim_doc_comment)]
    pub input: PathBuf,

    /// Print the per-file results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchInput {
    Wrapped { files: Vec<FileRequest> },
    Bare(Vec<FileRequest>),
}

impl BatchInput {
    fn into_files(self) -> Vec<FileRequest> {
        match self {
            BatchInput::Wrapped { files } | BatchInput::Bare(files) => files,
        }
    }
}

pub fn execute(args: SyncArgs, config: &Config) -> Result<()> {
    let raw = if args.input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(&args.input)?
    };
    let files = parse_batch(&raw)?;

    let bridge = Bridge::open(config)?;
    let report = bridge.sync(&files)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&SyncResponse::from(report))?
        );
    } else {
        report.print_summary();
    }
    Ok(())
}

fn parse_batch(raw: &str) -> Result<Vec<FileRequest>> {
    Ok(serde_json::from_str::<BatchInput>(raw)?.into_files())
}
