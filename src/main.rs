//! VideoDownloaderPro entry point
//!
//! Parses the command line, sets up logging and runs the selected command.
//! Errors are shown with a suggestion and end the process with exit code 1.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vdpro::cli;
use vdpro::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = cli.build_config();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vdpro={}", config.log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute_with_config(config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
