use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Invalid tier '{0}': expected one of daily, weekly, monthly, yearly")]
    InvalidTier(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot list tier directory {}: {source}", .path.display())]
    TierUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read archive {}: {reason}", .path.display())]
    ArchiveUnreadable { path: PathBuf, reason: String },

    #[error("Malformed manifest in {}: {reason}", .path.display())]
    ManifestMalformed { path: PathBuf, reason: String },
}

impl CatalogError {
    pub fn archive_unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CatalogError::ArchiveUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn manifest_malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CatalogError::ManifestMalformed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CatalogError::InvalidTier(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match &self {
            CatalogError::InvalidTier(_) => self.to_string(),
            CatalogError::Configuration(_) => {
                tracing::error!("{self}");
                "Backups directory is not configured".to_string()
            }
            _ => {
                tracing::error!("Catalog request failed: {self}");
                "Internal server error".to_string()
            }
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
