#[cfg(feature = "azure")]
mod inner {
    use async_trait::async_trait;
    use azure_storage::StorageCredentials;
    use azure_storage_blobs::prelude::*;
    use bytes::Bytes;
    use chrono::{DateTime, Utc};
    use futures::StreamExt;

    use smartdocs_core::error::GatewayError;
    use smartdocs_core::keys::join_url;
    use smartdocs_core::types::ObjectRecord;

    use crate::gateway::{GatewayResult, StorageGateway};

    /// Closure mapping an SDK error onto the gateway taxonomy.
    macro_rules! sdk_error {
        () => {
            |e| {
                let status = e
                    .as_http_error()
                    .map(|http| (http.status() as u16, http.error_code()));
                classify(status, e.to_string())
            }
        };
    }

    const EMULATOR_BLOB_URL: &str = "http://127.0.0.1:10000/devstoreaccount1";

    /// Azure Blob Storage gateway.
    pub struct AzureGateway {
        container_client: ContainerClient,
        container: String,
        base_url: String,
        name: String,
    }

    impl AzureGateway {
        /// Create from storage account name + access key.
        pub fn new(account: &str, access_key: &str, container: &str, name: &str) -> Self {
            let credentials = StorageCredentials::access_key(account, access_key.to_string());
            let container_client =
                ClientBuilder::new(account, credentials).container_client(container);

            Self {
                container_client,
                container: container.to_string(),
                base_url: format!("https://{account}.blob.core.windows.net/{container}"),
                name: name.to_string(),
            }
        }

        /// Create using the emulator (Azurite).
        pub fn emulator(container: &str, name: &str) -> Self {
            let container_client = ClientBuilder::emulator().container_client(container);

            Self {
                container_client,
                container: container.to_string(),
                base_url: format!("{EMULATOR_BLOB_URL}/{container}"),
                name: name.to_string(),
            }
        }

        pub fn with_public_base_url(mut self, url: Option<String>) -> Self {
            if let Some(url) = url {
                self.base_url = url;
            }
            self
        }

        fn record(&self, blob: &Blob) -> ObjectRecord {
            ObjectRecord {
                key: blob.name.clone(),
                last_modified: DateTime::<Utc>::from_timestamp(
                    blob.properties.last_modified.unix_timestamp(),
                    blob.properties.last_modified.nanosecond(),
                )
                .unwrap_or_default(),
                size_bytes: blob.properties.content_length,
                access_url: self.resolve_access_url(&blob.name),
            }
        }
    }

    #[async_trait]
    impl StorageGateway for AzureGateway {
        async fn list(&self) -> GatewayResult<Vec<ObjectRecord>> {
            let mut records = Vec::new();
            let mut pages = self.container_client.list_blobs().into_stream();

            while let Some(page) = pages.next().await {
                let page = page.map_err(sdk_error!())?;
                records.extend(page.blobs.blobs().map(|blob| self.record(blob)));
            }

            Ok(records)
        }

        async fn head(&self, key: &str) -> GatewayResult<ObjectRecord> {
            let resp = self
                .container_client
                .blob_client(key)
                .get_properties()
                .await
                .map_err(sdk_error!())?;
            Ok(self.record(&resp.blob))
        }

        async fn write(&self, key: &str, data: Bytes, content_type: &str) -> GatewayResult<()> {
            self.container_client
                .blob_client(key)
                .put_block_blob(data)
                .content_type(content_type.to_string())
                .await
                .map_err(sdk_error!())?;
            Ok(())
        }

        fn resolve_access_url(&self, key: &str) -> String {
            join_url(&self.base_url, key)
        }

        async fn test_connection(&self) -> GatewayResult<()> {
            self.container_client
                .get_properties()
                .await
                .map_err(sdk_error!())?;
            Ok(())
        }

        fn container(&self) -> &str {
            &self.container
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    /// Map an SDK failure onto the gateway taxonomy. Service error codes win
    /// over the bare status; HEAD responses carry no code.
    fn classify(status: Option<(u16, Option<&str>)>, message: String) -> GatewayError {
        match status {
            Some((status, code)) => {
                match code.unwrap_or_default() {
                    "AuthenticationFailed" | "AuthorizationFailure" | "InsufficientAccountPermissions" => {
                        GatewayError::Unauthorized(message)
                    }
                    "ContainerNotFound" | "BlobNotFound" | "ResourceNotFound" => {
                        GatewayError::NotFound(message)
                    }
                    "RequestBodyTooLarge" | "AccountIsDisabled" | "InsufficientStorage" => {
                        GatewayError::QuotaExceeded(message)
                    }
                    _ => GatewayError::from_status(status, message),
                }
            }
            None => GatewayError::NetworkFailure(message),
        }
    }

}

#[cfg(feature = "azure")]
pub use inner::AzureGateway;
