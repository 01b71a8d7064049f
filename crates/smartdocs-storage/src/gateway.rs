use async_trait::async_trait;
use bytes::Bytes;

use smartdocs_core::error::GatewayError;
use smartdocs_core::types::ObjectRecord;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Narrow adapter over one container of a remote object store.
///
/// Implementations hold no state between calls beyond their client handle.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Enumerate every object in the container.
    ///
    /// Paginated listings are drained before returning; a failure on any page
    /// fails the whole call.
    async fn list(&self) -> GatewayResult<Vec<ObjectRecord>>;

    /// Fetch the metadata of a single object.
    async fn head(&self, key: &str) -> GatewayResult<ObjectRecord>;

    /// Store `data` under `key`. The object is either fully listable afterwards
    /// or the call fails.
    async fn write(&self, key: &str, data: Bytes, content_type: &str) -> GatewayResult<()>;

    /// Address at which the object's bytes can be fetched. No network I/O.
    fn resolve_access_url(&self, key: &str) -> String;

    /// Test connectivity and credentials.
    async fn test_connection(&self) -> GatewayResult<()>;

    /// Container this gateway is bound to.
    fn container(&self) -> &str;

    /// Provider name for display.
    fn name(&self) -> &str;
}
