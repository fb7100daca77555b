//! `pure1-token` command.

use std::io::Write;

use anyhow::Context;
use pure1_authn::{AccessToken, KeyLoader, PasswordPrompt, Zeroizing, acquire_access_token};

use crate::{
    args::{CommonArgs, TokenArgs},
    config::FileConfig,
};

/// Loads the key named by `args` and exchanges a fresh assertion for a token.
///
/// # Errors
///
/// Fails on configuration, key loading, signing or exchange errors.
pub async fn fetch_token<P: PasswordPrompt>(
    args: &CommonArgs,
    file: &FileConfig,
    full_assertion: bool,
    loader: &KeyLoader<P>,
) -> anyhow::Result<AccessToken> {
    let config = file.exchange_config(args, full_assertion)?;
    let password = args.password.clone().map(Zeroizing::new);
    let key = loader.load(&args.private_key_file, password)?;
    Ok(acquire_access_token(&config, &key).await?)
}

/// Runs `pure1-token`: prints the token, or writes it to `--output` and
/// reports the path.
///
/// # Errors
///
/// Fails if the token cannot be obtained or written.
pub async fn execute<P: PasswordPrompt>(
    args: &TokenArgs,
    loader: &KeyLoader<P>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let file = FileConfig::load(args.common.config.as_deref())?;
    let token = fetch_token(&args.common, &file, args.full_assertion, loader).await?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, token.as_str())
                .await
                .with_context(|| format!("failed to write access token to {}", path.display()))?;
            writeln!(out, "Access token written to {}", path.display())?;
        },
        None => writeln!(out, "{}", token.as_str())?,
    }
    Ok(())
}
