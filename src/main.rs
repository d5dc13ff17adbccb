//! containerci entry point
//!
//! Parses the CI inputs, runs the selected mode and reports failures with a
//! suggestion when one is known.

use anyhow::Result;
use clap::Parser;
use containerci_cli::cli;
use containerci_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
