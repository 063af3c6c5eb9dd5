// ABOUTME: OAuth credential handling for the decksmith application
// ABOUTME: Loads, refreshes and interactively obtains Google access tokens

use crate::errors::{DeckError, Result};
use crate::net;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tiny_http::{Response, Server};
use url::Url;

/// OAuth scopes required for copying, editing and sharing decks.
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/presentations",
];

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

// Tokens within this window of expiry are refreshed early so a long pipeline
// run does not outlive its credential mid-flight.
const EXPIRY_LEEWAY_SECS: i64 = 60;

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// OAuth client registration, read from the standard installed-app
/// `credentials.json` file.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    #[serde(alias = "web")]
    installed: InstalledSecrets,
}

#[derive(Debug, Clone, Deserialize)]
struct InstalledSecrets {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_auth_uri")]
    auth_uri: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

impl ClientSecrets {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(DeckError::FileReadError)?;
        serde_json::from_str(&content).map_err(|e| {
            DeckError::AuthError(format!("Invalid client secrets file {:?}: {}", path, e))
        })
    }
}

/// A persisted access/refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: DateTime<Utc>,
}

impl StoredToken {
    pub fn is_expired(&self) -> bool {
        Utc::now() + ChronoDuration::seconds(EXPIRY_LEEWAY_SECS) >= self.expiry
    }
}

/// Persistence seam for token material, so tests can swap in an in-memory
/// store instead of touching real files.
pub trait TokenStore {
    fn load(&self) -> Result<Option<StoredToken>>;
    fn save(&self, token: &StoredToken) -> Result<()>;
}

/// Token store backed by a local JSON file.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<StoredToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(DeckError::FileReadError)?;
        match serde_json::from_str(&content) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                warn!(
                    "Ignoring unreadable token file {:?}: {}",
                    self.path, e
                );
                Ok(None)
            }
        }
    }

    fn save(&self, token: &StoredToken) -> Result<()> {
        let content = serde_json::to_string_pretty(token)?;
        fs::write(&self.path, content).map_err(DeckError::FileReadError)
    }
}

/// Shape of the token endpoint's response for both the refresh and the
/// authorization-code exchanges.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_stored(self, fallback_refresh: Option<String>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(fallback_refresh),
            expiry: Utc::now() + ChronoDuration::seconds(self.expires_in),
        }
    }
}

/// Produces valid access tokens: stored if still fresh, refreshed when
/// expired, interactively obtained when absent or unusable. Whatever it
/// obtains is persisted through the injected store for later runs.
pub struct Authenticator<S: TokenStore> {
    secrets: ClientSecrets,
    store: S,
    http: Client,
}

impl<S: TokenStore> Authenticator<S> {
    pub fn new(secrets: ClientSecrets, store: S) -> Result<Self> {
        let http = net::build_client(Some(Duration::from_secs(30)))?;
        Ok(Self {
            secrets,
            store,
            http,
        })
    }

    /// Return a valid access token, going through refresh or the interactive
    /// consent flow as needed.
    pub fn access_token(&self) -> Result<String> {
        match self.store.load()? {
            Some(token) if !token.is_expired() => Ok(token.access_token),
            Some(token) if token.refresh_token.is_some() => match self.refresh(&token) {
                Ok(refreshed) => Ok(refreshed),
                Err(e) => {
                    warn!("Token refresh failed, falling back to consent flow: {}", e);
                    self.interactive_consent()
                }
            },
            _ => self.interactive_consent(),
        }
    }

    fn refresh(&self, token: &StoredToken) -> Result<String> {
        info!("Refreshing expired access token");
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| DeckError::AuthError("No refresh token available".to_string()))?;

        let response = self
            .http
            .post(&self.secrets.installed.token_uri)
            .form(&[
                ("client_id", self.secrets.installed.client_id.as_str()),
                ("client_secret", self.secrets.installed.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()?;

        let response = net::require_success("token refresh", response)?;
        let parsed: TokenResponse = response.json()?;
        let stored = parsed.into_stored(token.refresh_token.clone());
        self.store.save(&stored)?;
        Ok(stored.access_token)
    }

    /// Run the installed-app consent flow: listen on a loopback port, send the
    /// user to the consent URL, then trade the returned code for tokens.
    fn interactive_consent(&self) -> Result<String> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|e| DeckError::AuthError(format!("Failed to start loopback listener: {}", e)))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| DeckError::AuthError("Loopback listener has no port".to_string()))?;
        let redirect_uri = format!("http://127.0.0.1:{}", port);

        let state = uuid::Uuid::new_v4().to_string();
        let scope = SCOPES.join(" ");
        let consent_url = Url::parse_with_params(
            &self.secrets.installed.auth_uri,
            &[
                ("client_id", self.secrets.installed.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| DeckError::AuthError(format!("Failed to build consent URL: {}", e)))?;

        println!("Open this URL in your browser to authorize decksmith:");
        println!("{}", consent_url);

        let code = wait_for_authorization_code(&server, &state)?;
        self.exchange_code(&code, &redirect_uri)
    }

    fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String> {
        let response = self
            .http
            .post(&self.secrets.installed.token_uri)
            .form(&[
                ("client_id", self.secrets.installed.client_id.as_str()),
                ("client_secret", self.secrets.installed.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()?;

        let response = net::require_success("token exchange", response)?;
        let parsed: TokenResponse = response.json()?;
        let stored = parsed.into_stored(None);
        self.store.save(&stored)?;
        info!("Authorization complete, token persisted");
        Ok(stored.access_token)
    }
}

/// Block until the browser redirect delivers an authorization code whose
/// state matches ours. Unrelated requests (favicons and the like) get a 404.
fn wait_for_authorization_code(server: &Server, expected_state: &str) -> Result<String> {
    loop {
        let request = server
            .recv()
            .map_err(|e| DeckError::AuthError(format!("Loopback listener failed: {}", e)))?;

        let full_url = format!("http://127.0.0.1{}", request.url());
        let parsed = Url::parse(&full_url)
            .map_err(|e| DeckError::AuthError(format!("Invalid redirect URL: {}", e)))?;

        let mut code = None;
        let mut state = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.to_string()),
                "state" => state = Some(value.to_string()),
                "error" => {
                    let _ = request.respond(Response::from_string("Authorization failed."));
                    return Err(DeckError::AuthError(format!(
                        "Consent was denied: {}",
                        value
                    )));
                }
                _ => {}
            }
        }

        match (code, state) {
            (Some(code), Some(state)) if state == expected_state => {
                let _ = request.respond(Response::from_string(
                    "Authorization received. You can close this window.",
                ));
                return Ok(code);
            }
            (Some(_), _) => {
                let _ = request.respond(Response::from_string("State mismatch."));
                return Err(DeckError::AuthError(
                    "Authorization state did not match the request".to_string(),
                ));
            }
            _ => {
                let _ = request.respond(Response::from_string("Not found.").with_status_code(404));
            }
        }
    }
}
