use crate::error::{Result, SmartdocsError};
use crate::types::ProviderType;
use crate::upload::UploadPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level smartdocs configuration stored as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartdocsConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// Target container (bucket for S3 backends, subdirectory for local).
    pub container: String,
    /// Azure storage account name.
    #[serde(default)]
    pub account: Option<String>,
    /// Azure account key, or S3 access key id.
    #[serde(default)]
    pub access_key: Option<String>,
    /// S3 secret key (for S3/S3Compatible providers).
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint URL for S3-compatible providers (MinIO, RustFS, Garage, etc.)
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Talk to the Azurite emulator instead of a real account.
    #[serde(default)]
    pub emulator: bool,
    /// Base directory for the local provider.
    #[serde(default)]
    pub path: Option<String>,
    /// Prefix used for access URLs instead of the backend-derived one.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs.max(1))
    }
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_call_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_accepted_types")]
    pub accepted_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            accepted_types: default_accepted_types(),
        }
    }
}

impl UploadConfig {
    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy::new(self.max_file_size, self.accepted_types.iter().cloned())
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_accepted_types() -> Vec<String> {
    vec![
        "application/pdf".to_string(),
        "image/jpeg".to_string(),
        "image/png".to_string(),
    ]
}

/// Credentials for an Azure storage account.
#[derive(Clone)]
pub struct AzureCredentials {
    pub account: String,
    pub access_key: String,
}

impl std::fmt::Debug for AzureCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureCredentials")
            .field("account", &self.account)
            .field("access_key", &"[REDACTED]")
            .finish()
    }
}

impl StorageConfig {
    /// Resolve the Azure account and key from the config file, falling back to
    /// `AZURE_STORAGE_ACCOUNT` / `AZURE_STORAGE_KEY`.
    pub fn azure_credentials(&self) -> Result<AzureCredentials> {
        let account = non_empty(self.account.clone())
            .or_else(|| env_var("AZURE_STORAGE_ACCOUNT"))
            .ok_or_else(|| {
                SmartdocsError::Configuration(
                    "azure storage account missing (set storage.account or AZURE_STORAGE_ACCOUNT)"
                        .to_string(),
                )
            })?;
        let access_key = non_empty(self.access_key.clone())
            .or_else(|| env_var("AZURE_STORAGE_KEY"))
            .ok_or_else(|| {
                SmartdocsError::Configuration(
                    "azure access key missing (set storage.access_key or AZURE_STORAGE_KEY)"
                        .to_string(),
                )
            })?;
        Ok(AzureCredentials {
            account,
            access_key,
        })
    }

    /// Explicit S3 key pair from the config file or `AWS_ACCESS_KEY_ID` /
    /// `AWS_SECRET_ACCESS_KEY`. `None` when neither source provides both.
    pub fn s3_key_pair(&self) -> Option<(String, String)> {
        let access = non_empty(self.access_key.clone()).or_else(|| env_var("AWS_ACCESS_KEY_ID"));
        let secret =
            non_empty(self.secret_key.clone()).or_else(|| env_var("AWS_SECRET_ACCESS_KEY"));
        access.zip(secret)
    }

    pub fn validate(&self) -> Result<()> {
        if self.container.trim().is_empty() {
            return Err(SmartdocsError::Configuration(
                "storage.container must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl SmartdocsConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SmartdocsError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| SmartdocsError::TomlDe(e.to_string()))?;
        tracing::debug!(path = %path.display(), provider = %config.storage.provider_type, "loaded config");
        Ok(config)
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| SmartdocsError::TomlSer(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config for `smartdocs init`: a local container under `base_dir`.
    pub fn default_config(base_dir: &Path) -> Self {
        Self {
            storage: StorageConfig {
                provider_type: ProviderType::Local,
                container: "rawinvoices".to_string(),
                account: None,
                access_key: None,
                secret_key: None,
                region: None,
                endpoint_url: None,
                emulator: false,
                path: Some(base_dir.join("storage").display().to_string()),
                public_base_url: None,
            },
            sync: SyncConfig::default(),
            upload: UploadConfig::default(),
        }
    }

    /// Resolve the config file path: `<base_dir>/smartdocs.toml`
    pub fn default_path(base_dir: &Path) -> PathBuf {
        base_dir.join("smartdocs.toml")
    }

    /// Resolve the default smartdocs home directory: `~/.smartdocs`
    pub fn default_base_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|h| h.join(".smartdocs"))
            .ok_or_else(|| {
                SmartdocsError::Configuration("Cannot determine home directory".to_string())
            })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn env_var(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}
