use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use super::models::RuntimeSettings;

pub struct SettingsStore {
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::new_with_path(app_data_root().join("settings.json"))
    }

    pub fn new_with_path(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Missing file means defaults. Stored values are sanitized on the way in.
    pub async fn load(&self) -> anyhow::Result<RuntimeSettings> {
        if !tokio::fs::try_exists(&self.file_path)
            .await
            .unwrap_or(false)
        {
            debug!(path = %self.file_path.display(), "no settings file, using defaults");
            return Ok(RuntimeSettings::default());
        }

        let content = tokio::fs::read_to_string(&self.file_path)
            .await
            .with_context(|| {
                format!("failed to read settings file {}", self.file_path.display())
            })?;

        let parsed = serde_json::from_str::<RuntimeSettings>(&content).with_context(|| {
            format!("invalid JSON in settings file {}", self.file_path.display())
        })?;

        Ok(parsed.sanitized())
    }

    pub async fn save(&self, settings: &RuntimeSettings) -> anyhow::Result<RuntimeSettings> {
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let sanitized = settings.clone().sanitized();
        let json = serde_json::to_string_pretty(&sanitized)?;
        tokio::fs::write(&self.file_path, json).await?;
        Ok(sanitized)
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

pub const DATA_DIR_ENV: &str = "SMARTHIRE_DATA_DIR";

/// Root for settings and saved sessions. `SMARTHIRE_DATA_DIR` wins over the
/// platform's local data directory.
pub fn app_data_root() -> PathBuf {
    data_root_from(std::env::var_os(DATA_DIR_ENV), dirs::data_local_dir())
}

fn data_root_from(override_dir: Option<OsString>, platform_dir: Option<PathBuf>) -> PathBuf {
    match override_dir.filter(|dir| !dir.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => platform_dir
            .unwrap_or_else(|| PathBuf::from("."))
            .join("SmartHire"),
    }
}
