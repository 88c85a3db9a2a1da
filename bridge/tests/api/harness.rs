//! Test harness: a live bridge on 127.0.0.1:0

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_common::Envelope;
use immich_bridge::config::BridgeConfig;
use immich_bridge::media::LocalMediaStore;
use immich_bridge::nonce::{NonceGuard, NonceRegistry, NonceScope};
use immich_bridge::settings::{MemorySettingsStore, Settings};
use immich_bridge::web::{create_router, AppState};
use serde::de::DeserializeOwned;
use tempfile::TempDir;

pub struct TestBridge {
    pub base: String,
    pub http: reqwest::Client,
    pub nonces: Arc<NonceRegistry>,
    pub settings: Arc<MemorySettingsStore>,
    pub media: TempDir,
}

/// Settings pointing at `upstream` with the key the mocks expect
pub fn settings_for(upstream: &str) -> Settings {
    Settings {
        server_url: upstream.to_string(),
        api_key: "test-key".to_string(),
    }
}

/// Start a bridge; `tweak` may adjust the config before the state is built
pub async fn spawn(settings: Settings, tweak: impl FnOnce(&mut BridgeConfig)) -> TestBridge {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let mut config = BridgeConfig::default();
    config.server.public_url = Some(base.clone());
    tweak(&mut config);

    let media = TempDir::new().unwrap();
    let store = LocalMediaStore::new(media.path(), &base);
    store.ensure_dirs().await.unwrap();
    let files = store.files_dir();

    let nonces = Arc::new(NonceRegistry::new(chrono::Duration::hours(1)));
    let settings = Arc::new(MemorySettingsStore::new(settings));

    let state = AppState::new(
        config,
        settings.clone(),
        Arc::new(store),
        nonces.clone(),
    )
    .unwrap();
    let app = create_router(state, Some(files));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestBridge {
        base,
        http: reqwest::Client::new(),
        nonces,
        settings,
        media,
    }
}

impl TestBridge {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn nonce(&self, scope: NonceScope) -> String {
        self.nonces.issue(scope).token
    }

    /// POST a form to an action, returning status and decoded envelope
    pub async fn action<T: DeserializeOwned>(
        &self,
        action: &str,
        form: &[(&str, &str)],
    ) -> (reqwest::StatusCode, Envelope<T>) {
        let response = self
            .http
            .post(self.url(&format!("/api/{action}")))
            .form(form)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    /// Scratch directory used for in-flight downloads
    pub fn scratch_dir(&self) -> PathBuf {
        self.media.path().join(".tmp")
    }
}

/// Whether `dir` is missing or has no entries
pub fn is_empty_dir(dir: &Path) -> bool {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}
