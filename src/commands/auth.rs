//! Authentication command handlers for OAuth flow.
//!
//! This module implements the CLI commands for:
//! - `expense-sheet auth` - Initial OAuth consent flow
//! - `expense-sheet auth --verify` - Verify and refresh authentication

use crate::api::TokenProvider;
use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;

/// Handles the `expense-sheet auth` command - runs the OAuth consent flow
///
/// This is the ONLY command that needs a browser for OAuth authentication.
///
/// This guides the user through setting up Google Sheets authentication:
/// 1. Loads client_secret.json
/// 2. Prints the consent URL and waits for Google to redirect back to a local port
/// 3. Saves tokens to token.json with required scopes
///
/// # Errors
/// Returns an error if OAuth flow fails or if client_secret.json is missing
pub async fn auth(config: &Config) -> Result<Out<()>> {
    let _ = TokenProvider::initialize(config.client_secret_path(), config.token_path()).await?;
    Ok(format!(
        "Authorization complete, tokens saved to {}",
        config.token_path().display()
    )
    .into())
}

/// Handles the `expense-sheet auth --verify` command - verifies authentication
///
/// This command NEVER opens a browser or triggers an interactive OAuth flow. It loads the saved
/// tokens, checks their scopes and refreshes the access token.
///
/// If the token is missing, invalid, or has the wrong scopes, this command will fail with an
/// error message telling the user to run `expense-sheet auth`.
pub async fn auth_verify(config: &Config) -> Result<Out<()>> {
    let mut token_provider = TokenProvider::load(config.client_secret_path(), config.token_path())
        .await
        .context(
            "Unable to use the existing tokens found in the token JSON file. \n\n\
            You should run 'expense-sheet auth' (without the --verify flag).",
        )?;
    token_provider
        .refresh()
        .await
        .context("Unable to refresh the token")?;
    Ok("Your OAuth token is valid!".into())
}
