//! Command-line arguments.

use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, Args, Parser, ValueEnum};
use url::Url;

/// Arguments shared by every tool.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Application ID from the Pure1 API registration page (e.g. pure1:apikey:dssf2331sd).
    #[arg(value_name = "API_ID")]
    pub api_id: String,

    /// Path to the API client private key.
    #[arg(value_name = "PRIVATE_KEY_FILE")]
    pub private_key_file: PathBuf,

    /// Private key password. Prompted for when the key is encrypted and this is omitted.
    #[arg(short, long, env = "PURE1_KEY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Token exchange endpoint.
    #[arg(long, value_name = "URL")]
    pub token_url: Option<Url>,

    /// Timeout for every network request (e.g. 15s, 1m).
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// TOML file with [exchange], [api] and [report] tables.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// `pure1-token`: retrieve an access token for the Pure1 public API.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pure1-token",
    version,
    about = "Retrieves an access token for the Pure1 public API"
)]
pub struct TokenArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Write the access token to this file instead of stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Send the full assertion (iss, sub, aud, iat, exp) instead of the minimal one.
    #[arg(long)]
    pub full_assertion: bool,
}

/// Report output format.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable listing.
    #[default]
    Text,
    /// JSON document with the window and one object per array.
    Json,
}

/// `pure1-fleet`: report capacity, data reduction and load for every array.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pure1-fleet",
    version,
    about = "Reports capacity, data reduction and load for every Pure1 array"
)]
pub struct FleetArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Reporting window in days.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub interval_days: Option<u32>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Abort the report on the first failed metrics query instead of zero-filling the row.
    #[arg(long)]
    pub fail_fast: bool,

    /// Maximum concurrent metrics queries.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Pure1 REST API base URL.
    #[arg(long, value_name = "URL")]
    pub api_url: Option<Url>,
}
