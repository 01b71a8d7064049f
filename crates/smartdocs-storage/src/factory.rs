//! Factory for creating the appropriate StorageGateway based on configuration.

use std::path::Path;
use std::sync::Arc;

use smartdocs_core::config::StorageConfig;
use smartdocs_core::error::{Result, SmartdocsError};
use smartdocs_core::types::ProviderType;

use crate::gateway::StorageGateway;
use crate::local::LocalGateway;

/// Build a gateway from the `[storage]` section.
///
/// Every configuration problem (missing credentials, container or path) is
/// reported here, before any network call is attempted.
///
/// Supported types:
/// - `"local"`: directory-backed container (requires `path`)
/// - `"azure"`: Azure Blob Storage (requires account + access key, or `emulator = true`)
/// - `"s3"`: AWS S3 (explicit keys, `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY` or `AWS_PROFILE`)
/// - `"s3compatible"`: MinIO and friends (requires `endpoint_url` and explicit keys)
pub async fn create_gateway(config: &StorageConfig) -> Result<Arc<dyn StorageGateway>> {
    config.validate()?;
    let container = config.container.trim();
    let name = format!("{}:{container}", config.provider_type);

    let gateway: Arc<dyn StorageGateway> = match config.provider_type {
        ProviderType::Local => {
            let base = config.path.as_deref().filter(|p| !p.trim().is_empty()).ok_or_else(|| {
                SmartdocsError::Configuration("storage.path required for local provider".to_string())
            })?;
            Arc::new(
                LocalGateway::new(Path::new(base), container, &name)?
                    .with_public_base_url(config.public_base_url.clone()),
            )
        }

        #[cfg(feature = "azure")]
        ProviderType::Azure => {
            let gateway = if config.emulator {
                crate::azure::AzureGateway::emulator(container, &name)
            } else {
                let creds = config.azure_credentials()?;
                crate::azure::AzureGateway::new(&creds.account, &creds.access_key, container, &name)
            };
            Arc::new(gateway.with_public_base_url(config.public_base_url.clone()))
        }

        #[cfg(not(feature = "azure"))]
        ProviderType::Azure => {
            return Err(SmartdocsError::Configuration(
                "azure feature not enabled. Recompile with --features azure".to_string(),
            ));
        }

        #[cfg(feature = "s3")]
        ProviderType::S3 | ProviderType::S3Compatible => {
            let compatible = config.provider_type == ProviderType::S3Compatible;
            let endpoint = config.endpoint_url.as_deref().filter(|e| !e.trim().is_empty());
            if compatible && endpoint.is_none() {
                return Err(SmartdocsError::Configuration(
                    "storage.endpoint_url required for s3compatible provider".to_string(),
                ));
            }
            let key_pair = config.s3_key_pair();
            let has_profile = std::env::var("AWS_PROFILE").is_ok_and(|p| !p.trim().is_empty());
            if key_pair.is_none() && (compatible || !has_profile) {
                return Err(SmartdocsError::Configuration(
                    "s3 credentials missing (set storage.access_key/secret_key or AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY)"
                        .to_string(),
                ));
            }
            let gateway = crate::s3::S3Gateway::with_options(crate::s3::S3Options {
                bucket: container,
                region: config.region.as_deref(),
                name: &name,
                endpoint_url: endpoint,
                path_style: compatible,
                access_key: key_pair.as_ref().map(|(ak, _)| ak.as_str()),
                secret_key: key_pair.as_ref().map(|(_, sk)| sk.as_str()),
            })
            .await;
            Arc::new(gateway.with_public_base_url(config.public_base_url.clone()))
        }

        #[cfg(not(feature = "s3"))]
        ProviderType::S3 | ProviderType::S3Compatible => {
            return Err(SmartdocsError::Configuration(
                "s3 feature not enabled. Recompile with --features s3".to_string(),
            ));
        }
    };

    tracing::debug!(gateway = gateway.name(), "storage gateway ready");
    Ok(gateway)
}
