//! Serialization and deserialization structures for Google OAuth credential files.
//! - `client_secret.json`: OAuth 2.0 client credentials from Google Cloud Console
//! - `token.json`: the tokens we received from Google

use crate::api::OAUTH_SCOPES;
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// The redirect URI the OAuth client must allow.
pub(super) const REDIRECT: &str = "http://localhost";

const LOOPBACK_REDIRECTS: [&str; 2] = [REDIRECT, "http://127.0.0.1"];

/// Holds the `path` of a JSON file along with its deserialized `data` so that it can be modified
/// in memory and saved back to where it came from.
#[derive(Default, Debug, Clone)]
pub(super) struct File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    path: PathBuf,
    data: F,
}

impl<F> File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    /// Load data from a file and create a File instance
    pub(super) async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data: F = utils::deserialize(&path).await?;
        Ok(Self { path, data })
    }

    /// Create a File instance with the given path and data
    pub(super) fn new(path: impl Into<PathBuf>, data: F) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Save the current data to the file, readable only by its owner.
    pub(super) async fn save(&self) -> Result<()> {
        let json =
            serde_json::to_string_pretty(&self.data).context("Failed to serialize data to JSON")?;
        utils::write(&self.path, json).await?;
        utils::restrict_permissions(&self.path)
    }

    pub(super) fn data(&self) -> &F {
        &self.data
    }

    pub(super) fn data_mut(&mut self) -> &mut F {
        &mut self.data
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }
}

/// The "Desktop app" OAuth client downloaded from the Google Cloud Console. Google wraps the
/// credentials in an `installed` object; the other fields of that object are not needed.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SecretFile {
    installed: Installed,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
struct Installed {
    client_id: String,
    client_secret: String,
    redirect_uris: Vec<String>,
    auth_uri: String,
    token_uri: String,
}

impl SecretFile {
    /// Loads the client and checks that it allows a loopback redirect. The consent flow listens
    /// on a random port of 127.0.0.1, which Google accepts for a registered `http://localhost`
    /// without a port.
    pub(crate) async fn load(path: &Path) -> Result<SecretFile> {
        let secret: SecretFile = utils::deserialize(path)
            .await
            .context("Unable to read the client secret file")?;
        let loopback = secret
            .installed
            .redirect_uris
            .iter()
            .any(|uri| LOOPBACK_REDIRECTS.contains(&uri.trim_end_matches('/')));
        ensure!(
            loopback,
            "The client secret in '{}' has no loopback redirect. Add '{REDIRECT}' to the redirect \
            URIs of the OAuth client and download the file again",
            path.display()
        );
        Ok(secret)
    }

    pub(super) fn client_id(&self) -> &str {
        &self.installed.client_id
    }

    pub(super) fn client_secret(&self) -> &str {
        &self.installed.client_secret
    }

    pub(super) fn auth_uri(&self) -> &str {
        &self.installed.auth_uri
    }

    pub(super) fn token_uri(&self) -> &str {
        &self.installed.token_uri
    }
}

/// This is how we save the token information that we receive from Google OAuth.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(super) struct TokenFile {
    scopes: Vec<String>,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenFile {
    pub(super) fn new(
        scopes: Vec<String>,
        access_token: String,
        refresh_token: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scopes,
            access_token,
            refresh_token,
            expires_at,
        }
    }

    pub(super) fn validate_scopes(&self) -> Result<()> {
        let found_scopes: HashSet<&str> = self.scopes.iter().map(|s| s.as_str()).collect();
        for &required_scope in OAUTH_SCOPES {
            if !found_scopes.contains(required_scope) {
                bail!("OAuth scope '{required_scope}' is missing.");
            }
        }
        Ok(())
    }

    pub(super) fn access_token(&self) -> &str {
        &self.access_token
    }

    pub(super) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Check if the token is expired or will expire soon (within 5 minutes)
    pub(super) fn is_expired(&self) -> bool {
        let now = Utc::now();
        let buffer = chrono::Duration::minutes(5);
        self.expires_at <= now + buffer
    }

    /// Google only sends a new refresh token occasionally, so the old one is kept unless a new
    /// one is given.
    pub(super) fn update(
        &mut self,
        access_token: String,
        expires_at: DateTime<Utc>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token;
        self.expires_at = expires_at;
        if let Some(rt) = refresh_token {
            self.refresh_token = rt;
        }
    }
}
