use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GatewayError;

/// One object currently present in the remote container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size_bytes: u64,
    pub access_url: String,
}

/// Which engine operation produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Refresh,
    Upload,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Refresh => write!(f, "refresh"),
            Operation::Upload => write!(f, "upload"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub operation: Operation,
    pub error: GatewayError,
    pub at: DateTime<Utc>,
}

impl ErrorDescriptor {
    pub fn new(operation: Operation, error: GatewayError) -> Self {
        Self {
            operation,
            error,
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Refreshing,
    Error,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Idle => write!(f, "idle"),
            EngineState::Refreshing => write!(f, "refreshing"),
            EngineState::Error => write!(f, "error"),
        }
    }
}

/// Point-in-time view of the container as last reported by the store.
///
/// `records` is always ordered by `last_modified`, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub records: Vec<ObjectRecord>,
    pub is_refreshing: bool,
    pub last_error: Option<ErrorDescriptor>,
    /// Incremented every time a new snapshot is published.
    pub version: u64,
    /// When the last successful listing completed.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl ViewSnapshot {
    pub fn state(&self) -> EngineState {
        if self.is_refreshing {
            EngineState::Refreshing
        } else if self.last_error.is_some() {
            EngineState::Error
        } else {
            EngineState::Idle
        }
    }

    pub fn record(&self, key: &str) -> Option<&ObjectRecord> {
        self.records.iter().find(|r| r.key == key)
    }

    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.size_bytes).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Local,
    S3,
    /// S3-compatible: MinIO, RustFS, Garage, Ceph RGW, SeaweedFS, etc.
    S3Compatible,
    Azure,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Local => write!(f, "local"),
            ProviderType::S3 => write!(f, "s3"),
            ProviderType::S3Compatible => write!(f, "s3compatible"),
            ProviderType::Azure => write!(f, "azure"),
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = crate::error::SmartdocsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(ProviderType::Local),
            "s3" => Ok(ProviderType::S3),
            "s3compatible" | "s3-compatible" | "minio" | "rustfs" | "garage" => {
                Ok(ProviderType::S3Compatible)
            }
            "azure" | "azurite" => Ok(ProviderType::Azure),
            _ => Err(crate::error::SmartdocsError::InvalidProviderType(
                s.to_string(),
            )),
        }
    }
}
