//! Command-line front end for the grocery expense tracking API.

// std
use std::process::ExitCode;
// crates.io
use clap::Parser;
// self
use grocery_admin::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
	Cli::parse().run().await
}
