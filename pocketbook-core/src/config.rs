//! Configuration management
//!
//! Settings live in `settings.json` in the data directory:
//! ```json
//! {
//!   "userId": "4f1c...",
//!   "batchSize": 50,
//!   "previewLimit": 100,
//!   "amountPolicy": "allowNegative",
//!   "importProfiles": {
//!     "sparkasse": {
//!       "columnMapping": { "amount": "Betrag", "description": "Text", "category": "NOT_MAPPED", "date": "Datum" },
//!       "dateFormat": "dd.MM.yy"
//!     }
//!   }
//! }
//! ```
//! Keys this crate does not know about are kept when saving.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{ColumnMapping, DateFormatHint};
use crate::services::{
    AmountPolicy, DEFAULT_BATCH_SIZE, DEFAULT_MAX_FILE_BYTES, DEFAULT_PREVIEW_LIMIT,
};

pub const SETTINGS_FILE: &str = "settings.json";

/// Environment variable overriding the signed-in user
pub const USER_ID_ENV: &str = "POCKETBOOK_USER_ID";

pub const DEFAULT_SESSION_REFRESH_SECS: u64 = 300;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    batch_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_file_bytes: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preview_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amount_policy: Option<AmountPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    batch_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_refresh_secs: Option<u64>,
    #[serde(default)]
    import_profiles: BTreeMap<String, ImportProfile>,
    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

/// Saved column mapping and date format for a recurring bank export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProfile {
    pub column_mapping: ColumnMapping,
    #[serde(default)]
    pub date_format: DateFormatHint,
}

/// Pocketbook configuration (resolved view of settings.json)
#[derive(Debug, Clone)]
pub struct Config {
    /// Signed-in user; the environment override wins over the file
    pub user_id: Option<String>,
    pub batch_size: usize,
    pub max_file_bytes: usize,
    pub preview_limit: usize,
    pub amount_policy: AmountPolicy,
    pub batch_timeout_secs: Option<u64>,
    pub session_refresh_secs: u64,
    pub import_profiles: BTreeMap<String, ImportProfile>,
    raw: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_settings(SettingsFile::default(), None)
    }
}

impl Config {
    fn from_settings(raw: SettingsFile, env_user_id: Option<String>) -> Self {
        Self {
            user_id: env_user_id.or_else(|| raw.user_id.clone()),
            batch_size: raw.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1),
            max_file_bytes: raw.max_file_bytes.unwrap_or(DEFAULT_MAX_FILE_BYTES),
            preview_limit: raw.preview_limit.unwrap_or(DEFAULT_PREVIEW_LIMIT),
            amount_policy: raw.amount_policy.unwrap_or_default(),
            batch_timeout_secs: raw.batch_timeout_secs.filter(|s| *s > 0),
            session_refresh_secs: raw
                .session_refresh_secs
                .unwrap_or(DEFAULT_SESSION_REFRESH_SECS),
            import_profiles: raw.import_profiles.clone(),
            raw,
        }
    }

    pub fn settings_path(data_dir: &Path) -> PathBuf {
        data_dir.join(SETTINGS_FILE)
    }

    /// Load config from the data directory
    ///
    /// A missing file gives the defaults. `POCKETBOOK_USER_ID` overrides the
    /// stored user id without being written back.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let env_user_id = std::env::var(USER_ID_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());
        Self::load_with_user_override(data_dir, env_user_id)
    }

    fn load_with_user_override(data_dir: &Path, env_user_id: Option<String>) -> Result<Self> {
        let raw = read_settings(&Self::settings_path(data_dir))?;
        Ok(Self::from_settings(raw, env_user_id))
    }

    /// Save managed fields, preserving keys other tools wrote
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let path = Self::settings_path(data_dir);

        // Re-read so edits made since load are not clobbered
        let mut settings = read_settings(&path)?;
        settings.user_id = self.raw.user_id.clone();
        settings.batch_size = Some(self.batch_size);
        settings.preview_limit = Some(self.preview_limit);
        settings.amount_policy = Some(self.amount_policy);
        settings.import_profiles = self.import_profiles.clone();

        std::fs::create_dir_all(data_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Set the stored user id (persisted on save)
    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        let id = user_id.into();
        self.raw.user_id = Some(id.clone());
        self.user_id = Some(id);
    }

    pub fn profile(&self, name: &str) -> Option<&ImportProfile> {
        self.import_profiles.get(name)
    }
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).with_context(|| format!("Invalid settings file {}", path.display()))
}
