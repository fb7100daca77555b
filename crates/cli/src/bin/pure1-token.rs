//! Retrieves an access token for the Pure1 public API.

use std::process::ExitCode;

use clap::Parser;
use pure1_authn::KeyLoader;
use pure1_cli::{TokenArgs, logging, token};

#[tokio::main]
async fn main() -> ExitCode {
    let args = TokenArgs::parse();
    logging::init(args.common.verbose);

    match token::execute(&args, &KeyLoader::terminal(), &mut std::io::stdout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        },
    }
}
