//! Binary entry point for `ai-bridge`.

use std::process;

fn main() {
    if let Err(e) = ai_bridge::run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
