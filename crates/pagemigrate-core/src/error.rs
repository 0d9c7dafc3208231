use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MigrateError>;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("skipped unreadable file {path}: {reason}")]
    SkippableFile { path: PathBuf, reason: String },

    #[error("malformed breadcrumb in {path}: {reason}")]
    MalformedBreadcrumb { path: PathBuf, reason: String },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// Serializable record of one document that a stage skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub code: String,
    pub path: String,
    pub message: String,
}

impl MigrateError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SkippableFile { .. } => "SKIPPABLE_FILE",
            Self::MalformedBreadcrumb { .. } => "MALFORMED_BREADCRUMB",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Toml(_) => "TOML_ERROR",
        }
    }

    /// Maps an I/O failure on `path` onto the per-item taxonomy.
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied(path.display().to_string())
        } else {
            Self::SkippableFile {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        }
    }

    pub fn to_skipped(&self, path: &std::path::Path) -> SkippedItem {
        SkippedItem {
            code: self.code().to_string(),
            path: path.display().to_string(),
            message: self.to_string(),
        }
    }
}
