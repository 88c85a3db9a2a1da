//! Admin handlers: settings (JSON and HTML form) and the editor page

use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};

use super::api::{respond, status_for, validate_image_id};
use super::pages::{self, Notice};
use super::state::AppState;
use crate::error::{BridgeError, BridgeResult};
use crate::media::StoredMedia;
use crate::nonce::NonceScope;
use crate::settings::Settings;

/// Settings as shown to admins; the key is masked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsView {
    pub server_url: String,
    pub api_key: String,
    pub configured: bool,
}

impl From<&Settings> for SettingsView {
    fn from(settings: &Settings) -> Self {
        Self {
            server_url: settings.server_url.clone(),
            api_key: settings.masked_api_key(),
            configured: settings.is_configured(),
        }
    }
}

/// Settings change; a missing or blank key keeps the stored one
#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub server_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

async fn apply_update(state: &AppState, update: SettingsUpdate) -> BridgeResult<Settings> {
    let current = state.settings.load().await?;
    let api_key = match update.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => current.api_key,
    };

    let settings = Settings::from_input(&update.server_url, &api_key)?;
    state.settings.save(&settings).await?;
    tracing::info!(
        server_url = %settings.server_url,
        configured = settings.is_configured(),
        "Settings updated"
    );
    Ok(settings)
}

/// `GET /api/settings`
pub async fn get_settings(
    State(state): State<AppState>,
) -> (StatusCode, Json<bridge_common::Envelope<SettingsView>>) {
    let result = state.settings.load().await.map(|s| SettingsView::from(&s));
    respond("settings", result)
}

/// `PUT /api/settings`
pub async fn put_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> (StatusCode, Json<bridge_common::Envelope<SettingsView>>) {
    let result = apply_update(&state, update)
        .await
        .map(|s| SettingsView::from(&s));
    respond("settings", result)
}

/// `GET /api/media/:id`: record of an imported file
pub async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<bridge_common::Envelope<StoredMedia>>) {
    let result = async {
        let id = validate_image_id(&id)?;
        state
            .media
            .get(id)
            .await?
            .ok_or_else(|| BridgeError::InvalidRequest(format!("No stored media with id {id}")))
    }
    .await;
    respond("media", result)
}

/// `GET /admin/settings`
pub async fn settings_page(State(state): State<AppState>) -> (StatusCode, Html<String>) {
    let endpoint = state.config.public_url();
    match state.settings.load().await {
        Ok(settings) => (
            StatusCode::OK,
            Html(
                pages::settings_page(
                    &endpoint,
                    &settings.server_url,
                    &settings.masked_api_key(),
                    None,
                )
                .into_string(),
            ),
        ),
        Err(e) => {
            tracing::error!("Failed to load settings: {}", e);
            (
                status_for(&e),
                Html(pages::settings_page(&endpoint, "", "", Some(Notice::Failed(e.to_string()))).into_string()),
            )
        }
    }
}

/// `POST /admin/settings`
pub async fn save_settings_form(
    State(state): State<AppState>,
    Form(update): Form<SettingsUpdate>,
) -> (StatusCode, Html<String>) {
    let endpoint = state.config.public_url();
    let submitted_url = update.server_url.clone();

    match apply_update(&state, update).await {
        Ok(settings) => (
            StatusCode::OK,
            Html(
                pages::settings_page(
                    &endpoint,
                    &settings.server_url,
                    &settings.masked_api_key(),
                    Some(Notice::Saved),
                )
                .into_string(),
            ),
        ),
        Err(e) => {
            tracing::warn!(kind = e.kind(), "Settings form rejected: {}", e);
            let masked = state
                .settings
                .load()
                .await
                .map(|s| s.masked_api_key())
                .unwrap_or_default();
            (
                status_for(&e),
                Html(
                    pages::settings_page(
                        &endpoint,
                        &submitted_url,
                        &masked,
                        Some(Notice::Failed(e.to_string())),
                    )
                    .into_string(),
                ),
            )
        }
    }
}

/// `GET /admin`
pub async fn editor_page(State(state): State<AppState>) -> Html<String> {
    let configured = state
        .settings
        .load()
        .await
        .map(|s| s.is_configured())
        .unwrap_or(false);
    let nonce = state.nonces.issue(NonceScope::Admin);
    let endpoint = state.config.public_url();
    let ctx = state.widget_context(&endpoint, &nonce.token);
    Html(pages::editor_page(&ctx, configured).into_string())
}
