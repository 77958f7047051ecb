use crate::error::{CatalogError, Result};
use crate::models::{CatalogLayout, Tier};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub backups_dir: Option<PathBuf>,
    pub layout: CatalogLayout,
    pub read_timeout: Option<Duration>,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            backups_dir: None,
            layout: CatalogLayout::default(),
            read_timeout: None,
            log_level: "info".into(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let layout = match var("CATALOG_LAYOUT") {
            Some(v) => v.parse()?,
            None => defaults.layout,
        };

        let read_timeout = match var("ARCHIVE_READ_TIMEOUT_SECS") {
            Some(v) => {
                let secs: u64 = v
                    .trim()
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid ARCHIVE_READ_TIMEOUT_SECS '{v}': {e}"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            port: var("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            backups_dir: var("BACKUPS_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            layout,
            read_timeout,
            log_level: var("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    pub fn backups_root(&self) -> BackupsRoot {
        BackupsRoot::new(self.backups_dir.clone())
    }
}

/// The configured directory holding one sub-directory per tier.
#[derive(Debug, Clone)]
pub struct BackupsRoot {
    root: Option<PathBuf>,
}

impl BackupsRoot {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn tier_dir(&self, tier: Tier) -> Result<PathBuf> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| CatalogError::Configuration("BACKUPS_DIR is not set".into()))?;
        if !root.is_absolute() {
            return Err(CatalogError::Configuration(format!(
                "BACKUPS_DIR must be an absolute path, got '{}'",
                root.display()
            )));
        }
        Ok(root.join(tier.as_str()))
    }
}
