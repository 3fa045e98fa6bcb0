//! Configuration types.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Client configuration, read from the environment.
#[derive(Debug)]
pub struct PortalConfig {
    /// Base URL of the portal REST backend.
    pub api_url: String,
    /// WebSocket URL of the portal notification feed.
    pub notifications_url: String,
    /// Account email used to log in.
    pub email: String,
    /// Account password used to log in.
    pub password: SecretString,
    /// Port for the browser-facing WebSocket chat server (None = CLI only).
    pub ws_port: Option<u16>,
}

impl PortalConfig {
    /// Read configuration from `PORTAL_*` environment variables.
    ///
    /// `PORTAL_EMAIL` and `PORTAL_PASSWORD` are required; everything else has
    /// a local-development default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("PORTAL_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());

        let notifications_url = std::env::var("PORTAL_NOTIFICATIONS_URL")
            .unwrap_or_else(|_| default_notifications_url(&api_url));

        let email = std::env::var("PORTAL_EMAIL")
            .map_err(|_| ConfigError::MissingEnvVar("PORTAL_EMAIL".to_string()))?;
        let password = std::env::var("PORTAL_PASSWORD")
            .map_err(|_| ConfigError::MissingEnvVar("PORTAL_PASSWORD".to_string()))?;

        let ws_port = match std::env::var("INTAKE_WS_PORT") {
            Ok(raw) => Some(raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "INTAKE_WS_PORT".to_string(),
                message: e.to_string(),
            })?),
            Err(_) => None,
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            notifications_url,
            email,
            password: SecretString::from(password),
            ws_port,
        })
    }
}

/// Derive a ws:// (or wss://) notification URL from the REST base URL.
fn default_notifications_url(api_url: &str) -> String {
    let ws_base = if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("ws://{api_url}")
    };
    format!("{}/ws/notifications", ws_base.trim_end_matches('/'))
}
