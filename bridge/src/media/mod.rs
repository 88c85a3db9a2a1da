//! Local media store
//!
//! Downloaded originals are "sideloaded" here: moved from the scratch
//! directory into a folder of their own, recorded with a JSON sidecar, and
//! given a public URL under `/media`.
//!
//! ```text
//! <root>/files/<local_id>/img.jpg   served at {public_url}/media/<local_id>/img.jpg
//! <root>/.meta/<local_id>.json      StoredMedia record
//! <root>/.tmp/<uuid>.part           in-flight downloads
//! ```
//!
//! Every import owns its folder, so imports sharing a file name never touch
//! each other's files.

mod markup;

pub use markup::image_markup;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{BridgeError, BridgeResult};

/// A stored, immutable media item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMedia {
    /// Id assigned by this store (differs across repeated imports)
    pub local_id: String,
    /// Immich asset id the file came from
    pub source_id: String,
    /// File name as stored
    pub filename: String,
    /// Public URL of the file
    pub url: String,
    /// Location on disk
    pub path: PathBuf,
    pub content_type: Option<String>,
    pub bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// A downloaded file waiting to be stored
#[derive(Debug, Clone, Copy)]
pub struct Sideload<'a> {
    pub temp_path: &'a Path,
    pub filename: &'a str,
    pub content_type: Option<&'a str>,
    pub source_id: &'a str,
}

/// Destination for imported images
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Directory where in-flight downloads are written
    fn scratch_dir(&self) -> PathBuf;

    /// Take ownership of a downloaded file and record it
    async fn sideload(&self, upload: Sideload<'_>) -> BridgeResult<StoredMedia>;

    /// Look up a previously stored item
    async fn get(&self, local_id: &str) -> BridgeResult<Option<StoredMedia>>;
}

/// Filesystem-backed media store
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    public_base: String,
}

impl LocalMediaStore {
    /// `public_base` is the externally visible base URL of the bridge
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Directory served at `/media`
    pub fn files_dir(&self) -> PathBuf {
        self.root.join("files")
    }

    fn meta_dir(&self) -> PathBuf {
        self.root.join(".meta")
    }

    /// Create the store's directories
    pub async fn ensure_dirs(&self) -> BridgeResult<()> {
        for dir in [self.files_dir(), self.meta_dir(), self.scratch_dir()] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| BridgeError::Storage(format!("{}: {e}", dir.display())))?;
        }
        Ok(())
    }

    /// Rename, falling back to copy + delete across filesystems
    async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
        if fs::rename(from, to).await.is_ok() {
            return Ok(());
        }

        fs::copy(from, to).await?;
        if let Err(e) = fs::remove_file(from).await {
            let _ = fs::remove_file(to).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    fn scratch_dir(&self) -> PathBuf {
        self.root.join(".tmp")
    }

    async fn sideload(&self, upload: Sideload<'_>) -> BridgeResult<StoredMedia> {
        let content_type = resolve_content_type(upload.filename, upload.content_type);
        if !content_type.starts_with("image/") {
            return Err(BridgeError::Storage(format!(
                "file type {content_type} is not permitted"
            )));
        }

        let filename = sanitize_filename(upload.filename, &content_type);
        let local_id = uuid::Uuid::new_v4().simple().to_string();

        // create_dir, not create_dir_all: the folder must be new
        let dir = self.files_dir().join(&local_id);
        let created = async {
            fs::create_dir_all(self.files_dir()).await?;
            fs::create_dir(&dir).await
        }
        .await;
        created.map_err(|e| BridgeError::Storage(format!("{}: {e}", dir.display())))?;

        let path = dir.join(&filename);
        if let Err(e) = Self::move_file(upload.temp_path, &path).await {
            let _ = fs::remove_dir_all(&dir).await;
            return Err(BridgeError::Storage(format!("{}: {e}", path.display())));
        }

        let bytes = match fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                let _ = fs::remove_dir_all(&dir).await;
                return Err(BridgeError::Storage(e.to_string()));
            }
        };

        let media = StoredMedia {
            url: format!("{}/media/{}/{}", self.public_base, local_id, filename),
            local_id,
            source_id: upload.source_id.to_string(),
            filename,
            path,
            content_type: Some(content_type),
            bytes,
            created_at: Utc::now(),
        };

        let meta_dir = self.meta_dir();
        let record = serde_json::to_vec_pretty(&media).map_err(|e| BridgeError::Storage(e.to_string()))?;
        let written = async {
            fs::create_dir_all(&meta_dir).await?;
            fs::write(meta_dir.join(format!("{}.json", media.local_id)), record).await
        }
        .await;
        if let Err(e) = written {
            // Don't leave an unrecorded file behind
            let _ = fs::remove_dir_all(&dir).await;
            return Err(BridgeError::Storage(format!("cannot record media: {e}")));
        }

        tracing::info!(
            local_id = %media.local_id,
            source_id = %media.source_id,
            bytes = media.bytes,
            "Stored {}",
            media.path.display()
        );
        Ok(media)
    }

    /// Look up a previously stored item
    async fn get(&self, local_id: &str) -> BridgeResult<Option<StoredMedia>> {
        let path = self.meta_dir().join(format!("{local_id}.json"));
        match fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| BridgeError::Storage(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BridgeError::Storage(e.to_string())),
        }
    }
}

/// Declared content type, or one guessed from the file name
fn resolve_content_type(filename: &str, declared: Option<&str>) -> String {
    declared
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
        .unwrap_or_else(|| {
            mime_guess::from_path(filename)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
}

/// Reduce a name to `[A-Za-z0-9._-]`, adding an extension if it has none
pub fn sanitize_filename(raw: &str, content_type: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        let mapped = match c {
            c if c.is_ascii_alphanumeric() || c == '.' || c == '_' => Some(c),
            '-' => Some('-'),
            c if c.is_whitespace() => Some('-'),
            _ => None,
        };
        if let Some(c) = mapped {
            if c == '-' && out.ends_with('-') {
                continue;
            }
            out.push(c);
        }
    }

    let mut name = out.trim_matches(|c| c == '.' || c == '-').to_string();
    if name.is_empty() {
        name = "image".to_string();
    }

    if !name.contains('.') {
        if let Some(ext) = mime_guess::get_mime_extensions_str(content_type).and_then(|e| e.first()) {
            name = format!("{name}.{ext}");
        }
    }
    name
}
