use crate::overlay::Holder;
use std::io;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, OverlayError>;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    #[error("No overlay for {holder} on resource {resource_id}")]
    OverlayNotFound { resource_id: Uuid, holder: Holder },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
