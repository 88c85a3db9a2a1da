//! HTTP service
//!
//! Serves the two widget actions plus the admin pages, the public widget,
//! embedded static assets and the imported media files.

pub mod admin;
pub mod api;
pub mod auth;
pub mod pages;
pub mod state;

use anyhow::{Context, Result};
use axum::{
    http::{header, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use rust_embed::RustEmbed;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::BridgeConfig;
use crate::media::LocalMediaStore;
use crate::nonce::NonceRegistry;
use crate::settings::FileSettingsStore;
pub use state::AppState;

/// Widget script and stylesheet
#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

/// Options for `serve`
pub struct ServeOptions {
    /// Open the editor page in a browser once listening
    pub open_browser: bool,
}

/// Build the state from `config` and run the server until shutdown
pub async fn serve(config: BridgeConfig, options: ServeOptions) -> Result<()> {
    let settings_path = config.settings_path()?;
    let settings = FileSettingsStore::new(&settings_path);
    tracing::info!("Settings file: {}", settings_path.display());

    let media_dir = config.media_dir()?;
    let media = LocalMediaStore::new(&media_dir, &config.public_url());
    media
        .ensure_dirs()
        .await
        .with_context(|| format!("preparing media directory {}", media_dir.display()))?;
    let files_dir = media.files_dir();
    tracing::info!("Media directory: {}", media_dir.display());

    let nonces = NonceRegistry::new(config.nonce_ttl());
    let bind = config.server.bind.clone();
    let admin_url = format!("{}/admin", config.public_url());
    if config.server.admin_token.is_none() {
        tracing::warn!("No admin token configured; admin routes are open");
    }

    let state = AppState::new(config, Arc::new(settings), Arc::new(media), Arc::new(nonces))?;
    let app = create_router(state, Some(files_dir));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    tracing::info!("Immich bridge listening on http://{}", listener.local_addr()?);

    if options.open_browser {
        if let Err(e) = open::that(&admin_url) {
            tracing::warn!("Could not open browser: {}", e);
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Create the router with all routes
///
/// `media_files` is the directory served under `/media`.
pub fn create_router(state: AppState, media_files: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_routes = Router::new()
        .route(
            "/api/settings",
            get(admin::get_settings).put(admin::put_settings),
        )
        .route(
            "/admin/settings",
            get(admin::settings_page).post(admin::save_settings_form),
        )
        .route("/api/media/:id", get(admin::get_media))
        .route("/admin", get(admin::editor_page))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    let public_routes = Router::new()
        // Widget actions
        .route("/api/search_images", post(api::search_images))
        .route("/api/get_image", post(api::get_image))
        .route("/api/thumbnail/:id", get(api::thumbnail))
        .route("/api/nonce", get(api::issue_nonce))
        .route("/api/health", get(api::health_check))
        // Public widget
        .route("/api/render", post(api::render_content))
        .route("/widget", get(api::widget))
        .route("/static/*path", get(static_handler));

    let mut router = Router::new().merge(admin_routes).merge(public_routes);
    if let Some(dir) = media_files {
        router = router.nest_service("/media", ServeDir::new(dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve embedded static files
async fn static_handler(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches("/static/");

    match StaticAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}
