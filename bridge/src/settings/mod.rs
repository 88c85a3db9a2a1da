//! Settings store
//!
//! Holds the two values the bridge needs to talk to Immich: the server base
//! URL and the API key. They are edited through the admin form and read on
//! every request, so a change takes effect on the next action without a
//! restart.

mod file;

pub use file::FileSettingsStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::error::{BridgeError, BridgeResult};

/// Connection settings for the Immich server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL, e.g. `https://photos.example.com` (no trailing slash)
    #[serde(default)]
    pub server_url: String,
    /// Value sent in the `x-api-key` header
    #[serde(default)]
    pub api_key: String,
}

impl Settings {
    /// Build settings from form input, normalizing the URL
    ///
    /// Empty values are accepted (they clear the setting); a non-empty URL
    /// must be an absolute http(s) URL.
    pub fn from_input(server_url: &str, api_key: &str) -> BridgeResult<Self> {
        Ok(Self {
            server_url: normalize_server_url(server_url)?,
            api_key: api_key.trim().to_string(),
        })
    }

    /// Both fields are set
    pub fn is_configured(&self) -> bool {
        !self.server_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    /// Fail with `ConfigMissing` unless both fields are set
    pub fn require(&self) -> BridgeResult<&Self> {
        if self.is_configured() {
            Ok(self)
        } else {
            Err(BridgeError::ConfigMissing)
        }
    }

    /// API key with everything but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), visible)
    }
}

/// Trim, validate and strip trailing slashes from a server URL
pub fn normalize_server_url(raw: &str) -> BridgeResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|e| BridgeError::InvalidRequest(format!("Invalid server URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(BridgeError::InvalidRequest(
            "Server URL must be an http or https address".to_string(),
        ));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Persistence for [`Settings`]
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the current settings (defaults when nothing is stored yet)
    async fn load(&self) -> BridgeResult<Settings>;

    /// Replace the stored settings
    async fn save(&self, settings: &Settings) -> BridgeResult<()>;
}

/// In-memory store, for tests and embedding callers
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    inner: RwLock<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> BridgeResult<Settings> {
        Ok(self
            .inner
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone()))
    }

    async fn save(&self, settings: &Settings) -> BridgeResult<()> {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = settings.clone();
        Ok(())
    }
}
