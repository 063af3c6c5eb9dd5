// ABOUTME: Configuration module for the decksmith application
// ABOUTME: Provides configuration settings and environment variable handling

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Global configuration for the application
pub struct Config {
    pub template_id: Option<String>,
    pub folder_id: Option<String>,
    pub token_path: PathBuf,
    pub client_secrets_path: PathBuf,
    pub download_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_id: env::var("DECKSMITH_TEMPLATE_ID").ok(),
            folder_id: env::var("DECKSMITH_FOLDER_ID").ok(),
            token_path: PathBuf::from("token.json"),
            client_secrets_path: PathBuf::from("credentials.json"),
            download_timeout_ms: 30000, // 30 seconds
        }
    }
}

impl Config {
    /// Create a new configuration instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let template_id = env::var("DECKSMITH_TEMPLATE_ID").ok();
        let folder_id = env::var("DECKSMITH_FOLDER_ID").ok();
        let token_path = env::var("DECKSMITH_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("token.json"));
        let client_secrets_path = env::var("DECKSMITH_CLIENT_SECRETS")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("credentials.json"));
        let download_timeout_ms = env::var("DECKSMITH_DOWNLOAD_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30000);

        Self {
            template_id,
            folder_id,
            token_path,
            client_secrets_path,
            download_timeout_ms,
        }
    }

    /// Per-request deadline for raw image downloads
    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }
}
