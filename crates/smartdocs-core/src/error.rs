use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmartdocsError {
    // IO
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Config
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration file not found at {0} (run `smartdocs init` first)")]
    ConfigNotFound(String),

    #[error("Invalid provider type: {0}")]
    InvalidProviderType(String),

    // Serialization
    #[error("TOML deserialization error: {0}")]
    TomlDe(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),
}

pub type Result<T> = std::result::Result<T, SmartdocsError>;

/// Failure reported by a storage gateway call.
///
/// Every variant carries the backend's message. Values are cheap to clone so
/// one listing outcome can be handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum GatewayError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

impl GatewayError {
    /// Classify an HTTP status code returned by an object store.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => GatewayError::Unauthorized(message),
            404 => GatewayError::NotFound(message),
            413 | 507 => GatewayError::QuotaExceeded(message),
            _ => GatewayError::NetworkFailure(message),
        }
    }

    /// Whether repeating the same call later can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::NetworkFailure(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized(_))
    }
}

/// Local rejection of an upload, raised before any gateway call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{name} is {size} bytes, larger than the {max} byte limit")]
    TooLarge { name: String, size: u64, max: u64 },

    #[error("{name} has unsupported type {content_type}")]
    UnsupportedType { name: String, content_type: String },

    #[error("{0} is empty")]
    EmptyFile(String),

    #[error("invalid file name {0:?}")]
    InvalidName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            GatewayError::from_status(403, "denied"),
            GatewayError::Unauthorized(_)
        ));
        assert!(matches!(
            GatewayError::from_status(401, "expired"),
            GatewayError::Unauthorized(_)
        ));
        assert!(matches!(
            GatewayError::from_status(404, "no container"),
            GatewayError::NotFound(_)
        ));
        assert!(matches!(
            GatewayError::from_status(507, "full"),
            GatewayError::QuotaExceeded(_)
        ));
        assert!(matches!(
            GatewayError::from_status(503, "busy"),
            GatewayError::NetworkFailure(_)
        ));
    }

    #[test]
    fn only_network_failures_are_retryable() {
        assert!(GatewayError::NetworkFailure("reset".into()).is_retryable());
        assert!(!GatewayError::Unauthorized("bad key".into()).is_retryable());
        assert!(!GatewayError::QuotaExceeded("full".into()).is_retryable());
    }

    #[test]
    fn validation_messages_name_the_file() {
        let err = ValidationError::TooLarge {
            name: "scan.pdf".into(),
            size: 20,
            max: 10,
        };
        assert_eq!(
            err.to_string(),
            "scan.pdf is 20 bytes, larger than the 10 byte limit"
        );
    }
}
