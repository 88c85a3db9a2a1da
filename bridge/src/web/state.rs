//! Shared application state

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::error::BridgeResult;
use crate::immich::ImmichClient;
use crate::media::MediaStore;
use crate::nonce::{NonceGuard, NonceScope};
use crate::settings::SettingsStore;
use crate::widget::WidgetContext;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BridgeConfig>,
    pub settings: Arc<dyn SettingsStore>,
    pub media: Arc<dyn MediaStore>,
    pub nonces: Arc<dyn NonceGuard>,
    /// Shared HTTP client for Immich calls
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: BridgeConfig,
        settings: Arc<dyn SettingsStore>,
        media: Arc<dyn MediaStore>,
        nonces: Arc<dyn NonceGuard>,
    ) -> Result<Self> {
        let http = ImmichClient::http_client(&config.immich.user_agent)
            .context("building HTTP client")?;
        Ok(Self {
            config: Arc::new(config),
            settings,
            media,
            nonces,
            http,
        })
    }

    /// Client for the currently saved settings
    ///
    /// Settings are read per request so admin changes apply immediately.
    pub async fn immich(&self) -> BridgeResult<ImmichClient> {
        let settings = self.settings.load().await?;
        ImmichClient::new(self.http.clone(), &settings, self.config.thumbnail_source())
    }

    /// Scopes allowed to call `search_images`
    pub fn search_scopes(&self) -> &'static [NonceScope] {
        if self.config.nonce.public_search {
            &[NonceScope::Admin, NonceScope::Public]
        } else {
            &[NonceScope::Admin]
        }
    }

    /// Widget wiring for a freshly issued token
    pub fn widget_context<'a>(&self, endpoint: &'a str, nonce: &'a str) -> WidgetContext<'a> {
        WidgetContext {
            endpoint,
            nonce,
            debounce_ms: self.config.widget.debounce_ms,
            min_query_chars: self.config.widget.min_query_chars,
        }
    }
}
