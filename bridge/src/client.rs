//! HTTP client for a running bridge
//!
//! Speaks the same url-encoded form protocol as `static/widget.js`, so the
//! CLI picker exercises exactly what a browser would.

use async_trait::async_trait;
use bridge_common::Envelope;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::immich::SearchResult;
use crate::import::ImportedAsset;
use crate::nonce::{IssuedNonce, NonceScope};
use crate::widget::BridgeApi;

/// Calls the bridge's actions with one token
#[derive(Clone)]
pub struct BridgeClient {
    http: Client,
    endpoint: String,
    nonce: String,
}

impl BridgeClient {
    pub fn new(http: Client, endpoint: &str, nonce: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            nonce: nonce.into(),
        }
    }

    /// Ask the bridge for a token; admin scope needs `admin_token` when one is configured
    pub async fn issue_nonce(
        http: &Client,
        endpoint: &str,
        scope: NonceScope,
        admin_token: Option<&str>,
    ) -> Result<IssuedNonce, String> {
        let url = format!("{}/api/nonce", endpoint.trim_end_matches('/'));
        let mut request = http.get(&url).query(&[("scope", scope.as_str())]);
        if let Some(token) = admin_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(connect_error)?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err("Admin token required".to_string());
        }
        decode(response).await
    }

    async fn post<T: DeserializeOwned>(&self, action: &str, field: (&str, &str)) -> Result<T, String> {
        let url = format!("{}/api/{}", self.endpoint, action);
        let response = self
            .http
            .post(&url)
            .form(&[("nonce", self.nonce.as_str()), field])
            .send()
            .await
            .map_err(connect_error)?;
        decode(response).await
    }
}

fn connect_error(e: reqwest::Error) -> String {
    format!("Error connecting to the server: {e}")
}

/// Read an envelope regardless of status; error envelopes carry the message
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, String> {
    let status = response.status();
    let text = response.text().await.map_err(connect_error)?;
    let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|_| {
        tracing::debug!(%status, body = %text, "non-envelope response");
        format!("Unexpected response from the server ({status})")
    })?;
    envelope.into_result().map_err(|e| e.to_string())
}

#[async_trait]
impl BridgeApi for BridgeClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, String> {
        self.post("search_images", ("query", query)).await
    }

    async fn import(&self, image_id: &str) -> Result<ImportedAsset, String> {
        self.post("get_image", ("image_id", image_id)).await
    }
}
