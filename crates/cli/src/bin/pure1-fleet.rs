//! Reports capacity, data reduction and load for every Pure1 array.

use std::process::ExitCode;

use clap::Parser;
use pure1_authn::KeyLoader;
use pure1_cli::{FleetArgs, fleet, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let args = FleetArgs::parse();
    logging::init(args.common.verbose);

    let loader = KeyLoader::terminal();
    match fleet::execute(&args, &loader, &mut std::io::stdout(), &mut std::io::stderr()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        },
    }
}
