#![deny(missing_docs)]

//! # apigee2oas CLI
//!
//! Command Line Interface for the bundle-to-OpenAPI converter.
//!
//! Supported Commands:
//! - `convert`: Local proxy bundle (ZIP or directory) -> OpenAPI document.
//! - `fetch`: Apigee management API -> revision bundles -> OpenAPI documents.

use clap::{Parser, Subcommand};

use crate::error::CliResult;

mod convert;
mod error;
#[cfg(feature = "client")]
mod fetch;
mod output;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Apigee proxy bundle to OpenAPI 3.0 converter")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Converts a local proxy bundle (ZIP file or exploded directory).
    Convert(convert::ConvertArgs),
    /// Downloads bundles from the Apigee management API and converts them.
    #[cfg(feature = "client")]
    Fetch(fetch::FetchArgs),
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Convert(args) => convert::execute(args)?,
        #[cfg(feature = "client")]
        Commands::Fetch(args) => fetch::execute(args)?,
    }

    Ok(())
}
