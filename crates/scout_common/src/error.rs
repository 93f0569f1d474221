//! Error types for Scout.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Search provider error: {0}")]
    Provider(String),

    #[error("Search provider returned HTTP {0}")]
    Status(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScoutError>;
