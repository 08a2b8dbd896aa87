//! Samples validator - runs API documentation code samples
//!
//! Executes JavaScript, Python and cURL samples against an API in resource
//! lifecycle order and reports which of them fail.

use clap::Parser;
use samples_validator::commands::Commands;
use samples_validator::{cli, common::logging};

#[derive(Parser)]
#[command(name = "samples-validator", about = "Validate API documentation code samples")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug logs
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    match cli::dispatch(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
