//! Configuration loading
//!
//! Service configuration comes from `.bridge.toml`. Search order:
//! 1. `BRIDGE_CONFIG_PATH`
//! 2. Current directory and parent directories (walking up to root)
//! 3. `~/.config/immich-bridge/bridge.toml`
//! 4. Default values
//!
//! The Immich URL and API key are *not* here: they live in the settings
//! store so the admin form can change them while the service runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::immich::ThumbnailSource;
use crate::settings::FileSettingsStore;

const CONFIG_FILE: &str = ".bridge.toml";

/// Find a config file by walking up the directory tree, then checking global config.
fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("BRIDGE_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }

    let mut current = std::env::current_dir().ok()?;
    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    let global = dirs::config_dir()?.join("immich-bridge").join("bridge.toml");
    global.exists().then_some(global)
}

/// Top-level configuration (from .bridge.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub media: MediaSection,
    #[serde(default)]
    pub settings: SettingsSection,
    #[serde(default)]
    pub nonce: NonceSection,
    #[serde(default)]
    pub widget: WidgetSection,
    #[serde(default)]
    pub immich: ImmichSection,
}

/// HTTP server section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Externally visible base URL (defaults to `http://{bind}`)
    #[serde(default)]
    pub public_url: Option<String>,
    /// Token required on admin routes (Bearer or Basic password); unset means open
    #[serde(default)]
    pub admin_token: Option<String>,
}

/// Local media store section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSection {
    #[serde(default = "default_media_dir")]
    pub dir: String,
}

/// Settings store section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsSection {
    /// Settings file (defaults to `~/.config/immich-bridge/settings.toml`)
    #[serde(default)]
    pub path: Option<String>,
}

/// Anti-forgery token section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceSection {
    #[serde(default = "default_nonce_ttl")]
    pub ttl_seconds: u64,
    /// Let public-widget tokens call `search_images`
    #[serde(default = "default_true")]
    pub public_search: bool,
}

/// Front-end controller section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetSection {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,
}

/// How thumbnails reach the browser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailMode {
    #[default]
    Direct,
    Proxy,
}

/// Immich client section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImmichSection {
    #[serde(default)]
    pub thumbnails: ThumbnailMode,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_media_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("immich-bridge")
        .join("media")
        .to_string_lossy()
        .to_string()
}

fn default_nonce_ttl() -> u64 {
    12 * 60 * 60
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_min_query_chars() -> usize {
    2
}

fn default_user_agent() -> String {
    format!("immich-bridge/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_url: None,
            admin_token: None,
        }
    }
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            dir: default_media_dir(),
        }
    }
}

impl Default for NonceSection {
    fn default() -> Self {
        Self {
            ttl_seconds: default_nonce_ttl(),
            public_search: default_true(),
        }
    }
}

impl Default for WidgetSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_chars: default_min_query_chars(),
        }
    }
}

impl Default for ImmichSection {
    fn default() -> Self {
        Self {
            thumbnails: ThumbnailMode::default(),
            user_agent: default_user_agent(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from file or use defaults
    pub fn load() -> Result<Self> {
        match find_config_file() {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from: {}", path.display());
                Self::load_from_path(&path)
            }
            Some(path) => {
                tracing::info!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: BridgeConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Externally visible base URL, without trailing slash
    pub fn public_url(&self) -> String {
        self.server
            .public_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://{}", self.server.bind))
    }

    /// Media directory with `~` and `$VARS` expanded
    pub fn media_dir(&self) -> Result<PathBuf> {
        expand_path(&self.media.dir)
    }

    /// Settings file location
    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.settings.path {
            Some(path) => expand_path(path),
            None => Ok(FileSettingsStore::default_path()),
        }
    }

    pub fn thumbnail_source(&self) -> ThumbnailSource {
        match self.immich.thumbnails {
            ThumbnailMode::Direct => ThumbnailSource::Direct,
            ThumbnailMode::Proxy => ThumbnailSource::Proxy {
                base_url: self.public_url(),
            },
        }
    }

    pub fn nonce_ttl(&self) -> chrono::Duration {
        // Capped at one year
        chrono::Duration::seconds(self.nonce.ttl_seconds.min(365 * 24 * 60 * 60) as i64)
    }

    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.widget.debounce_ms)
    }
}

fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("expanding path {raw}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
