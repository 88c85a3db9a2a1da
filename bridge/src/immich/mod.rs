//! Immich REST client
//!
//! Wraps the handful of Immich endpoints the bridge consumes:
//!
//! - `GET /api/search?q=...`: free-text search
//! - `GET /api/asset/{id}`: asset metadata
//! - `GET /api/asset/download/{id}`: original binary
//! - `GET /api/asset/thumbnail/{id}`: preview binary
//!
//! Every request carries the configured key in the `x-api-key` header.

pub mod types;

use reqwest::{header, Client, Response, StatusCode};
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::settings::Settings;
use types::{AssetInfo, AssetList, ProviderError, SearchResponse};

pub use types::SearchResult;

const API_KEY_HEADER: &str = "x-api-key";
const SEARCH_FAILED: &str = "Error retrieving images from Immich";
const DETAILS_FAILED: &str = "Error retrieving image details from Immich";

/// Where result thumbnails are loaded from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ThumbnailSource {
    /// Straight from `{server_url}/api/asset/thumbnail/{id}`
    #[default]
    Direct,
    /// Through the bridge's own `/api/thumbnail/{id}` route, which adds the API key
    Proxy { base_url: String },
}

/// Result of streaming an original asset to disk
#[derive(Debug, Clone)]
pub struct Downloaded {
    pub bytes: u64,
    pub content_type: Option<String>,
}

/// Client for one configured Immich server
///
/// Cheap to build: the underlying `reqwest::Client` is shared, so a new
/// `ImmichClient` is made for every request from freshly loaded settings.
#[derive(Clone)]
pub struct ImmichClient {
    http: Client,
    server_url: String,
    api_key: String,
    thumbnails: ThumbnailSource,
}

impl ImmichClient {
    /// Build a client, failing with `ConfigMissing` if either setting is empty
    pub fn new(http: Client, settings: &Settings, thumbnails: ThumbnailSource) -> BridgeResult<Self> {
        let settings = settings.require()?;
        Ok(Self {
            http,
            server_url: settings.server_url.trim().trim_end_matches('/').to_string(),
            api_key: settings.api_key.trim().to_string(),
            thumbnails,
        })
    }

    /// Shared HTTP client used for every Immich request
    pub fn http_client(user_agent: &str) -> reqwest::Result<Client> {
        Client::builder().user_agent(user_agent).build()
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{}", self.server_url, path))
            .header(API_KEY_HEADER, &self.api_key)
    }

    /// URL the widget should load a result's preview from
    pub fn thumbnail_url(&self, id: &str) -> String {
        match &self.thumbnails {
            ThumbnailSource::Direct => format!("{}/api/asset/thumbnail/{}", self.server_url, id),
            ThumbnailSource::Proxy { base_url } => {
                format!("{}/api/thumbnail/{}", base_url.trim_end_matches('/'), id)
            }
        }
    }

    /// Free-text search
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> BridgeResult<Vec<SearchResult>> {
        let response = self
            .get("/api/search")
            .query(&[("q", query)])
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| BridgeError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::Upstream(e.to_string()))?;

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            warn!("Unparsable search response: {}", e);
            BridgeError::Upstream(SEARCH_FAILED.to_string())
        })?;

        if !value.is_object() {
            return Err(BridgeError::Upstream(SEARCH_FAILED.to_string()));
        }
        if value.get("error").is_some_and(|e| !e.is_null()) {
            return Err(BridgeError::Upstream(
                provider_text(&value).unwrap_or_else(|| SEARCH_FAILED.to_string()),
            ));
        }

        let parsed: SearchResponse = serde_json::from_value(value).map_err(|e| {
            warn!("Unexpected search response shape: {}", e);
            BridgeError::Upstream(SEARCH_FAILED.to_string())
        })?;

        let results: Vec<SearchResult> = parsed
            .assets
            .map(AssetList::into_vec)
            .unwrap_or_default()
            .into_iter()
            .map(|asset| SearchResult {
                thumbnail_url: self.thumbnail_url(&asset.id),
                filename: asset
                    .original_file_name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| asset.id.clone()),
                id: asset.id,
            })
            .collect();

        debug!(count = results.len(), "search finished");
        Ok(results)
    }

    /// Fetch asset metadata
    #[instrument(skip(self))]
    pub async fn asset_info(&self, id: &str) -> BridgeResult<AssetInfo> {
        let response = self
            .get(&format!("/api/asset/{id}"))
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| BridgeError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let value: Value = response.json().await.map_err(|e| {
            warn!("Unparsable asset response: {}", e);
            BridgeError::Upstream(DETAILS_FAILED.to_string())
        })?;

        let empty = match &value {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => return Err(BridgeError::Upstream(DETAILS_FAILED.to_string())),
        };
        if empty {
            return Err(BridgeError::Upstream(
                "Image not found on the Immich server".to_string(),
            ));
        }
        if value.get("error").is_some_and(|e| !e.is_null()) {
            return Err(BridgeError::Upstream(
                provider_text(&value).unwrap_or_else(|| DETAILS_FAILED.to_string()),
            ));
        }

        let mut info: AssetInfo = serde_json::from_value(value)
            .map_err(|_| BridgeError::Upstream(DETAILS_FAILED.to_string()))?;
        if info.id.is_empty() {
            info.id = id.to_string();
        }
        Ok(info)
    }

    /// Stream the original asset into `dest`
    ///
    /// On any failure the partially written file is removed before the
    /// `DownloadError` is returned.
    #[instrument(skip(self, dest), fields(dest = %dest.display()))]
    pub async fn download_to(&self, id: &str, dest: &Path) -> BridgeResult<Downloaded> {
        let result = self.stream_original(id, dest).await;
        if result.is_err() {
            if let Err(e) = fs::remove_file(dest).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!("Could not remove partial download: {}", e);
                }
            }
        }
        result
    }

    async fn stream_original(&self, id: &str, dest: &Path) -> BridgeResult<Downloaded> {
        let mut response = self
            .get(&format!("/api/asset/download/{id}"))
            .header(header::ACCEPT, "application/octet-stream")
            .send()
            .await
            .map_err(|e| BridgeError::Download(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let detail = provider_message(status, &text);
            return Err(BridgeError::Download(detail));
        }

        let content_type = content_type(&response);
        let mut file = fs::File::create(dest)
            .await
            .map_err(|e| BridgeError::Download(format!("cannot create temp file: {e}")))?;

        let mut bytes = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| BridgeError::Download(e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| BridgeError::Download(e.to_string()))?;
            bytes += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| BridgeError::Download(e.to_string()))?;

        if bytes == 0 {
            return Err(BridgeError::Download("Immich returned an empty file".to_string()));
        }

        debug!(bytes, "download finished");
        Ok(Downloaded {
            bytes,
            content_type,
        })
    }

    /// Fetch a thumbnail (used by the thumbnail proxy route)
    #[instrument(skip(self))]
    pub async fn thumbnail(&self, id: &str) -> BridgeResult<(Option<String>, Vec<u8>)> {
        let response = self
            .get(&format!("/api/asset/thumbnail/{id}"))
            .send()
            .await
            .map_err(|e| BridgeError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let content_type = content_type(&response);
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::Upstream(e.to_string()))?;
        Ok((content_type, body.to_vec()))
    }
}

fn content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Turn a non-success response into an `UpstreamError` carrying the provider's message
async fn upstream_error(response: Response) -> BridgeError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    warn!(%status, "Immich request failed");
    BridgeError::Upstream(provider_message(status, &text))
}

fn provider_text(value: &Value) -> Option<String> {
    serde_json::from_value::<ProviderError>(value.clone())
        .ok()
        .and_then(|e| e.text())
}

fn provider_message(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| provider_text(&v))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.chars().take(200).collect())
        });

    match detail {
        Some(detail) => format!("Immich error {}: {}", status, detail),
        None => format!("Immich error {}", status),
    }
}
