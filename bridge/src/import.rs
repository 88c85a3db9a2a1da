//! Image import
//!
//! Turns an Immich asset id into a locally stored image plus the markup to
//! insert it: metadata, then download, then sideload, then markup. Each step
//! has its own failure class so the caller can tell them apart.

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::immich::ImmichClient;
use crate::media::{image_markup, MediaStore, Sideload};

/// What the `get_image` action returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedAsset {
    /// Local media id
    pub id: String,
    /// Markup to insert into the editor
    pub html: String,
    /// Canonical URL of the stored file
    pub url: String,
}

/// Imports Immich assets into a [`MediaStore`]
pub struct ImageImporter<'a> {
    client: &'a ImmichClient,
    store: &'a dyn MediaStore,
}

impl<'a> ImageImporter<'a> {
    pub fn new(client: &'a ImmichClient, store: &'a dyn MediaStore) -> Self {
        Self { client, store }
    }

    /// Import one asset
    ///
    /// Fails with `Upstream` when the metadata can't be fetched, `Download`
    /// when the original can't be fetched, and `Storage` when it can't be
    /// stored. No temp file survives a failed import.
    #[instrument(skip(self))]
    pub async fn import(&self, id: &str) -> BridgeResult<ImportedAsset> {
        let id = id.trim();
        if id.is_empty() {
            return Err(BridgeError::InvalidRequest("Image ID is required".to_string()));
        }

        let info = self.client.asset_info(id).await?;
        debug!(file = ?info.original_file_name, "fetched asset metadata");

        let scratch = self.store.scratch_dir();
        fs::create_dir_all(&scratch)
            .await
            .map_err(|e| BridgeError::Storage(format!("{}: {e}", scratch.display())))?;
        let temp = scratch.join(format!("{}.part", uuid::Uuid::new_v4().simple()));

        let downloaded = self.client.download_to(id, &temp).await?;

        let content_type = downloaded.content_type.or(info.original_mime_type);
        let filename = info
            .original_file_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| id.to_string());

        let stored = self
            .store
            .sideload(Sideload {
                temp_path: &temp,
                filename: &filename,
                content_type: content_type.as_deref(),
                source_id: id,
            })
            .await;

        let media = match stored {
            Ok(media) => media,
            Err(e) => {
                // Best effort; the import already failed
                if let Err(rm) = fs::remove_file(&temp).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!("Could not remove temp download {}: {}", temp.display(), rm);
                    }
                }
                return Err(match e {
                    BridgeError::Storage(_) => e,
                    other => BridgeError::Storage(other.to_string()),
                });
            }
        };

        info!(local_id = %media.local_id, "Imported {} as {}", id, media.url);
        Ok(ImportedAsset {
            html: image_markup(&media),
            url: media.url,
            id: media.local_id,
        })
    }
}
