//! Immich REST API types
//!
//! Only the fields the bridge reads are modelled; everything else in the
//! server's responses is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One search hit as returned to the widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Opaque Immich asset id
    pub id: String,
    /// Where the widget loads the preview from
    pub thumbnail_url: String,
    /// Original file name of the asset
    pub filename: String,
}

/// `GET /api/search` response body
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub assets: Option<AssetList>,
}

/// Servers answer either with a bare list or with a page object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AssetList {
    Flat(Vec<AssetSummary>),
    Paged {
        #[serde(default)]
        items: Vec<AssetSummary>,
    },
}

impl AssetList {
    pub fn into_vec(self) -> Vec<AssetSummary> {
        match self {
            Self::Flat(items) | Self::Paged { items } => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssetSummary {
    pub id: String,
    #[serde(default)]
    pub original_file_name: Option<String>,
}

/// `GET /api/asset/{id}` response body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub original_file_name: Option<String>,
    #[serde(default)]
    pub original_mime_type: Option<String>,
}

/// Error body shape used by the Immich server
#[derive(Debug, Deserialize)]
pub(crate) struct ProviderError {
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl ProviderError {
    /// Best human-readable message in the body, if any
    pub fn text(&self) -> Option<String> {
        self.message
            .as_ref()
            .and_then(value_text)
            .or_else(|| self.error.as_ref().and_then(value_text))
    }
}

/// Render a string or list-of-strings JSON value
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    }
}
