//! Action handlers
//!
//! `search_images` and `get_image` are the two actions the widget calls.
//! Both take a url-encoded form, check the anti-forgery token first, and
//! always answer with an [`Envelope`].

use axum::{
    extract::{rejection::FormRejection, Form, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use bridge_common::Envelope;
use serde::{Deserialize, Serialize};

use super::auth;
use super::state::AppState;
use crate::error::{BridgeError, BridgeResult};
use crate::immich::{SearchResult, ThumbnailSource};
use crate::import::{ImageImporter, ImportedAsset};
use crate::nonce::{IssuedNonce, NonceScope};
use crate::widget::markup::{expand_placeholders, widget_page, DEFAULT_PLACEHOLDER};

type ActionResponse<T> = (StatusCode, Json<Envelope<T>>);

/// HTTP status for a failed action
pub fn status_for(err: &BridgeError) -> StatusCode {
    match err {
        BridgeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        BridgeError::InvalidNonce => StatusCode::FORBIDDEN,
        BridgeError::Upstream(_) | BridgeError::Download(_) => StatusCode::BAD_GATEWAY,
        BridgeError::ConfigMissing => StatusCode::SERVICE_UNAVAILABLE,
        BridgeError::Storage(_)
        | BridgeError::SettingsIo(_)
        | BridgeError::SettingsParse(_)
        | BridgeError::SettingsSerialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Wrap an action outcome, logging failures
pub(super) fn respond<T>(action: &'static str, result: BridgeResult<T>) -> ActionResponse<T> {
    match result {
        Ok(data) => (StatusCode::OK, Json(Envelope::ok(data))),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(action, kind = e.kind(), "{} failed: {}", action, e);
            } else {
                tracing::warn!(action, kind = e.kind(), "{} rejected: {}", action, e);
            }
            (status, Json(Envelope::err(e.to_string())))
        }
    }
}

/// Remove control characters, collapse whitespace runs, trim
pub fn sanitize_text(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trimmed asset id made only of `[A-Za-z0-9-_]`
pub fn validate_image_id(raw: &str) -> BridgeResult<&str> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(BridgeError::InvalidRequest("Image ID is required".to_string()));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(BridgeError::InvalidRequest("Invalid image ID".to_string()));
    }
    Ok(id)
}

/// Form fields for `search_images`
#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub query: String,
}

/// Form fields for `get_image`
#[derive(Debug, Default, Deserialize)]
pub struct ImportForm {
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub image_id: String,
}

/// Form fields, or an empty form when the body isn't url-encoded
///
/// An empty form carries no nonce, so the action still answers with an
/// envelope instead of axum's plain-text rejection.
fn form_or_default<T: Default>(action: &'static str, form: Result<Form<T>, FormRejection>) -> T {
    match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::debug!(action, "Unreadable form: {}", rejection.body_text());
            T::default()
        }
    }
}

/// Search the Immich library
pub async fn search_images(
    State(state): State<AppState>,
    form: Result<Form<SearchForm>, FormRejection>,
) -> ActionResponse<Vec<SearchResult>> {
    let form = form_or_default("search_images", form);
    respond("search_images", run_search(&state, form).await)
}

async fn run_search(state: &AppState, form: SearchForm) -> BridgeResult<Vec<SearchResult>> {
    state.nonces.verify(&form.nonce, state.search_scopes())?;
    // Missing settings win over a bad query
    let client = state.immich().await?;

    let query = sanitize_text(&form.query);
    let min = state.config.widget.min_query_chars;
    if query.chars().count() < min {
        return Err(BridgeError::InvalidRequest(format!(
            "Please enter at least {min} characters to search"
        )));
    }

    let results = client.search(&query).await?;
    tracing::info!(query = %query, count = results.len(), "search_images");
    Ok(results)
}

/// Import an Immich asset into local media
pub async fn get_image(
    State(state): State<AppState>,
    form: Result<Form<ImportForm>, FormRejection>,
) -> ActionResponse<ImportedAsset> {
    let form = form_or_default("get_image", form);
    respond("get_image", run_import(&state, form).await)
}

async fn run_import(state: &AppState, form: ImportForm) -> BridgeResult<ImportedAsset> {
    state.nonces.verify(&form.nonce, &[NonceScope::Admin])?;
    let client = state.immich().await?;
    let id = validate_image_id(&form.image_id)?;

    ImageImporter::new(&client, state.media.as_ref())
        .import(id)
        .await
}

/// Thumbnail proxy; 404 unless `immich.thumbnails = "proxy"`
pub async fn thumbnail(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if state.config.thumbnail_source() == ThumbnailSource::Direct {
        return StatusCode::NOT_FOUND.into_response();
    }

    let result = async {
        let id = validate_image_id(&id)?;
        state.immich().await?.thumbnail(id).await
    }
    .await;

    match result {
        Ok((content_type, bytes)) => (
            [
                (
                    header::CONTENT_TYPE,
                    content_type.unwrap_or_else(|| "image/jpeg".to_string()),
                ),
                (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(kind = e.kind(), "thumbnail {} failed: {}", id, e);
            (status_for(&e), e.to_string()).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NonceParams {
    pub scope: Option<String>,
}

/// Issue an anti-forgery token; admin scope needs admin auth
pub async fn issue_nonce(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<NonceParams>,
) -> Response {
    let scope = match params.scope.as_deref().unwrap_or("public").parse::<NonceScope>() {
        Ok(scope) => scope,
        Err(e) => return respond::<IssuedNonce>("nonce", Err(e)).into_response(),
    };

    if scope == NonceScope::Admin
        && !auth::is_authorized(state.config.server.admin_token.as_deref(), &headers)
    {
        tracing::warn!("Refused admin nonce to unauthenticated caller");
        return auth::unauthorized();
    }

    respond("nonce", Ok(state.nonces.issue(scope))).into_response()
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub configured: bool,
    pub thumbnails: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let configured = match state.settings.load().await {
        Ok(settings) => settings.is_configured(),
        Err(e) => {
            tracing::error!("Failed to load settings: {}", e);
            false
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        configured,
        thumbnails: match state.config.thumbnail_source() {
            ThumbnailSource::Direct => "direct".to_string(),
            ThumbnailSource::Proxy { .. } => "proxy".to_string(),
        },
    })
}

/// Expand `[immich_search]` markers in posted content
pub async fn render_content(State(state): State<AppState>, body: String) -> Html<String> {
    let nonce = state.nonces.issue(NonceScope::Public);
    let endpoint = state.config.public_url();
    let ctx = state.widget_context(&endpoint, &nonce.token);
    Html(expand_placeholders(&body, &ctx))
}

#[derive(Debug, Deserialize)]
pub struct WidgetParams {
    pub placeholder: Option<String>,
}

/// Standalone public widget page
pub async fn widget(
    State(state): State<AppState>,
    Query(params): Query<WidgetParams>,
) -> Html<String> {
    let nonce = state.nonces.issue(NonceScope::Public);
    let endpoint = state.config.public_url();
    let ctx = state.widget_context(&endpoint, &nonce.token);
    let placeholder = params
        .placeholder
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(DEFAULT_PLACEHOLDER);
    Html(widget_page(&ctx, placeholder).into_string())
}
