//! Command-line tool generating Swagger 2.0 / OpenAPI 3.0 documents from
//! annotated Go controllers.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-annotations [OPTIONS]
//! ```
//!
//! # Examples
//!
//! Generate `swagger.json` (OpenAPI 3.0) next to the entry file:
//! ```bash
//! openapi-from-annotations -s ./swagger.go
//! ```
//!
//! Generate a Swagger 2.0 `swagger.yaml` into `docs/`, private operations included:
//! ```bash
//! openapi-from-annotations -s ./swagger.go -o docs -f yaml --openapi v2 --dev
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_annotations::cli;

fn main() -> Result<()> {
    // Parse once up front so the verbose flag can configure the logger
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("openapi-from-annotations starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;
    let written = cli::run(args)?;

    info!("Document written to {}", written.display());

    Ok(())
}
