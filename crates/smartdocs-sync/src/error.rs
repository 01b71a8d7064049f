use thiserror::Error;

use smartdocs_core::error::{GatewayError, SmartdocsError, ValidationError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] SmartdocsError),

    #[error("Refresh failed: {0}")]
    Refresh(GatewayError),

    #[error("Storage error: {0}")]
    Gateway(GatewayError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Upload of {key} failed: {reason}")]
    UploadFailed { key: String, reason: GatewayError },

    #[error("Sync engine has been stopped")]
    Stopped,
}
