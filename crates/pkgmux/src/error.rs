use std::path::PathBuf;

use pkgmux_backend::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Settings file {} is invalid: {message}", .path.display())]
    Settings { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn settings(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Settings {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
