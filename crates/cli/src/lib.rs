//! # Pure1 CLI
//!
//! Shared implementation of the `pure1-token` and `pure1-fleet` binaries.
//!
//! Both tools take an API client ID and a private key file, sign a fresh
//! identity assertion and exchange it for an access token. `pure1-token`
//! prints the token; `pure1-fleet` uses it to report capacity, data
//! reduction and load for every array in the fleet.
//!
//! Commands take the [`KeyLoader`](pure1_authn::KeyLoader) and output
//! writer as parameters so they run unchanged under test.

#![deny(unsafe_code)]

pub mod args;
pub mod config;
pub mod fleet;
pub mod logging;
pub mod output;
pub mod token;

pub use args::{CommonArgs, FleetArgs, OutputFormat, TokenArgs};
pub use config::FileConfig;
