//! Error types for bridge operations
//!
//! Every failure a request can hit is one of these variants. They are all
//! recovered at the router boundary and reported to the caller as the
//! envelope's error string; none of them is fatal to the process.

use thiserror::Error;

/// Errors that can occur while serving a search or import action
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Server URL or API key is unset
    #[error("Immich API configuration is missing")]
    ConfigMissing,

    /// The Immich server failed, answered with an error, or sent an unparsable body
    #[error("{0}")]
    Upstream(String),

    /// The original asset could not be downloaded
    #[error("Failed to download image: {0}")]
    Download(String),

    /// The downloaded asset could not be stored locally
    #[error("Failed to store image: {0}")]
    Storage(String),

    /// The anti-forgery token was absent, unknown, expired, or of the wrong scope
    #[error("Security check failed")]
    InvalidNonce,

    /// The request fields did not validate
    #[error("{0}")]
    InvalidRequest(String),

    /// Settings file could not be read or written
    #[error("settings I/O error: {0}")]
    SettingsIo(#[from] std::io::Error),

    /// Settings file is not valid TOML
    #[error("settings file is invalid: {0}")]
    SettingsParse(#[from] toml::de::Error),

    /// Settings could not be serialized
    #[error("settings could not be serialized: {0}")]
    SettingsSerialize(#[from] toml::ser::Error),
}

impl BridgeError {
    /// Short machine-readable kind, used as a tracing field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigMissing => "config_missing",
            Self::Upstream(_) => "upstream",
            Self::Download(_) => "download",
            Self::Storage(_) => "storage",
            Self::InvalidNonce => "invalid_nonce",
            Self::InvalidRequest(_) => "invalid_request",
            Self::SettingsIo(_) | Self::SettingsParse(_) | Self::SettingsSerialize(_) => {
                "settings"
            }
        }
    }
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
