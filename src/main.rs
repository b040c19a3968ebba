//! qchat_bundler - packages the Amazon Q CLI chat GUI for macOS.
//!
//! Builds the .app bundle around the resolved q binary and assembles the
//! DMG installer, with fail-fast error handling and artifact verification.

mod bundler;
mod cli;
mod error;

use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Run CLI and get exit code
    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    process::exit(exit_code);
}
