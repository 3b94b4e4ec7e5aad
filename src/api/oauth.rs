//! OAuth 2.0 for the Google Sheets API.
//!
//! `TokenProvider::initialize` runs the installed-app consent flow: it listens on a local port,
//! asks the user to open the consent URL, receives the authorization code on the loopback
//! redirect and exchanges it (with PKCE) for tokens, which are saved to `token.json`.
//! `TokenProvider::load` uses the saved tokens and refreshes the access token when it is close to
//! expiring. Only `initialize` ever needs a browser.

use crate::api::files::{File, SecretFile, TokenFile, REDIRECT};
use crate::api::OAUTH_SCOPES;
use crate::Result;
use anyhow::{anyhow, bail, ensure, Context};
use chrono::{DateTime, Utc};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, Uri};
use hyper_util::rt::TokioIo;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::convert::Infallible;
use std::path::Path;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info};

type OAuthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Used when Google does not say how long an access token lives.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Holds the client credentials and the saved tokens, and hands out a valid access token.
pub(crate) struct TokenProvider {
    secret: SecretFile,
    token: File<TokenFile>,
    http: reqwest::Client,
}

impl TokenProvider {
    /// Runs the interactive consent flow and saves the resulting tokens to `token_path`.
    pub(crate) async fn initialize(
        client_secret_path: impl AsRef<Path>,
        token_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let secret = SecretFile::load(client_secret_path.as_ref()).await?;
        let http = http_client()?;
        let token_file = consent_flow(&secret, &http).await?;
        let token = File::new(token_path.as_ref(), token_file);
        token.save().await?;
        info!("Tokens saved to {}", token.path().display());
        Ok(Self {
            secret,
            token,
            http,
        })
    }

    /// Loads previously saved tokens. Never opens a browser.
    pub(crate) async fn load(
        client_secret_path: impl AsRef<Path>,
        token_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let secret = SecretFile::load(client_secret_path.as_ref()).await?;
        let token: File<TokenFile> = File::load(token_path.as_ref())
            .await
            .context("Unable to load the OAuth token file, run the 'auth' command first")?;
        token.data().validate_scopes()?;
        Ok(Self {
            secret,
            token,
            http: http_client()?,
        })
    }

    /// The current access token, which may be expired.
    pub(crate) fn token(&self) -> &str {
        self.token.data().access_token()
    }

    /// Returns an access token, refreshing it first if it is expired or about to expire.
    pub(crate) async fn token_with_refresh(&mut self) -> Result<&str> {
        if self.token.data().is_expired() {
            self.refresh().await?;
        }
        Ok(self.token())
    }

    /// Uses the refresh token to get a new access token and saves it.
    pub(crate) async fn refresh(&mut self) -> Result<()> {
        debug!("Refreshing the OAuth access token");
        let client = oauth_client(&self.secret, None)?;
        let refresh_token = RefreshToken::new(self.token.data().refresh_token().to_string());
        let response = client
            .exchange_refresh_token(&refresh_token)
            .request_async(&self.http)
            .await
            .context("Failed to refresh the OAuth access token")?;

        self.token.data_mut().update(
            response.access_token().secret().to_string(),
            expires_at(&response),
            response.refresh_token().map(|rt| rt.secret().to_string()),
        );
        self.token.save().await
    }
}

/// Walks the user through consent and returns the tokens Google grants.
async fn consent_flow(secret: &SecretFile, http: &reqwest::Client) -> Result<TokenFile> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .context("Unable to listen on a local port for the OAuth callback")?;
    let port = listener
        .local_addr()
        .context("Unable to read the local callback address")?
        .port();
    let client = oauth_client(secret, Some(format!("{REDIRECT}:{port}")))?;

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let (auth_url, csrf_token) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(OAUTH_SCOPES.iter().map(|s| Scope::new(s.to_string())))
        .add_extra_param("access_type", "offline")
        .add_extra_param("prompt", "consent")
        .set_pkce_challenge(pkce_challenge)
        .url();

    info!("Open this URL in your browser to authorize access to your sheet:\n\n{auth_url}\n");
    info!("Waiting for the authorization callback on http://localhost:{port}");

    let callback = receive_callback(listener).await?;
    ensure!(
        callback.state == *csrf_token.secret(),
        "The OAuth callback state did not match, the authorization was not completed"
    );

    let response = client
        .exchange_code(AuthorizationCode::new(callback.code))
        .set_pkce_verifier(pkce_verifier)
        .request_async(http)
        .await
        .context("Failed to exchange the authorization code for tokens")?;

    let refresh_token = response
        .refresh_token()
        .context("Google did not return a refresh token")?
        .secret()
        .to_string();
    let scopes = match response.scopes() {
        Some(scopes) => scopes.iter().map(|s| s.to_string()).collect(),
        None => OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
    };

    info!("Authorization successful!");
    Ok(TokenFile::new(
        scopes,
        response.access_token().secret().to_string(),
        refresh_token,
        expires_at(&response),
    ))
}

/// What Google sends to the redirect URI.
#[derive(Debug, Clone, Eq, PartialEq)]
struct Callback {
    code: String,
    state: String,
}

/// Serves the loopback redirect until a request carrying either an authorization code or an
/// error arrives. Other requests, such as a browser asking for `/favicon.ico`, are answered and
/// ignored.
async fn receive_callback(listener: TcpListener) -> Result<Callback> {
    let (tx, mut rx) = mpsc::channel::<Result<Callback>>(1);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _) = accepted.context("Failed to accept the OAuth callback")?;
                let tx = tx.clone();
                let service = service_fn(move |request: Request<Incoming>| {
                    let tx = tx.clone();
                    async move {
                        let outcome = parse_callback(request.uri());
                        let body = match &outcome {
                            Some(Ok(_)) => "Authorization complete. You can close this window.",
                            Some(Err(_)) => "Authorization failed. Check the terminal for details.",
                            None => "Waiting for authorization.",
                        };
                        if let Some(outcome) = outcome {
                            let _ = tx.send(outcome).await;
                        }
                        Ok::<_, Infallible>(Response::new(body.to_string()))
                    }
                });
                tokio::spawn(async move {
                    if let Err(e) = http1::Builder::new()
                        .keep_alive(false)
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        debug!("OAuth callback connection error: {e}");
                    }
                });
            }
            Some(outcome) = rx.recv() => return outcome,
        }
    }
}

/// Returns `None` when the request is not the OAuth redirect.
fn parse_callback(uri: &Uri) -> Option<Result<Callback>> {
    let query = uri.query()?;
    let mut code = None;
    let mut state = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Some(Err(anyhow!("Authorization was denied: {value}"))),
            _ => {}
        }
    }
    match (code, state) {
        (Some(code), Some(state)) => Some(Ok(Callback { code, state })),
        (Some(_), None) => Some(Err(anyhow!("The OAuth callback is missing its state"))),
        _ => None,
    }
}

fn oauth_client(secret: &SecretFile, redirect: Option<String>) -> Result<OAuthClient> {
    let client = BasicClient::new(ClientId::new(secret.client_id().to_string()))
        .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
        .set_auth_uri(AuthUrl::new(secret.auth_uri().to_string()).context("Invalid auth_uri")?)
        .set_token_uri(
            TokenUrl::new(secret.token_uri().to_string()).context("Invalid token_uri")?,
        );
    Ok(match redirect {
        Some(redirect) => client
            .set_redirect_uri(RedirectUrl::new(redirect).context("Invalid redirect URI")?),
        None => client,
    })
}

/// The OAuth token endpoints must not follow redirects.
fn http_client() -> Result<reqwest::Client> {
    match reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
    {
        Ok(client) => Ok(client),
        Err(e) => bail!("Unable to build the HTTP client: {e}"),
    }
}

fn expires_at(response: &BasicTokenResponse) -> DateTime<Utc> {
    let lifetime = response
        .expires_in()
        .and_then(|d| chrono::Duration::from_std(d).ok())
        .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));
    Utc::now() + lifetime
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_code() {
        let uri: Uri = "/?state=abc&code=4%2F0Ad&scope=x".parse().unwrap();
        let callback = parse_callback(&uri).unwrap().unwrap();
        assert_eq!(
            callback,
            Callback {
                code: "4/0Ad".to_string(),
                state: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_parse_callback_error() {
        let uri: Uri = "/?error=access_denied&state=abc".parse().unwrap();
        let err = parse_callback(&uri).unwrap().unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn test_parse_callback_unrelated_request() {
        let uri: Uri = "/favicon.ico".parse().unwrap();
        assert!(parse_callback(&uri).is_none());
    }
}
