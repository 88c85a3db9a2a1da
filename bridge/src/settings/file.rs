//! TOML-file backed settings store

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{Settings, SettingsStore};
use crate::error::BridgeResult;

/// Stores settings as a small TOML file
///
/// Writes go to a sibling temp file that is renamed into place, so a reader
/// never sees a half-written file. Each write uses its own temp name, so
/// concurrent saves never share one.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `~/.config/immich-bridge/settings.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("immich-bridge")
            .join("settings.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `settings.toml.<uuid>.tmp` next to the settings file
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "settings.toml".to_string());
        self.path
            .with_file_name(format!("{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
    }

    /// Write `settings` only when no settings file exists yet
    ///
    /// Returns whether anything was written.
    pub async fn seed_if_missing(&self, settings: &Settings) -> BridgeResult<bool> {
        if fs::try_exists(&self.path).await? {
            return Ok(false);
        }
        self.save(settings).await?;
        tracing::info!("Seeded settings file at {}", self.path.display());
        Ok(true)
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> BridgeResult<Settings> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings file at {}", self.path.display());
                Ok(Settings::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, settings: &Settings) -> BridgeResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(settings)?;
        let tmp = self.temp_path();
        let written = async {
            fs::write(&tmp, content).await?;

            // The file holds an API key
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
            }

            fs::rename(&tmp, &self.path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tracing::info!("Settings saved to {}", self.path.display());
        Ok(())
    }
}
