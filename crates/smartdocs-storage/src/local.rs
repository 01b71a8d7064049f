use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use smartdocs_core::error::GatewayError;
use smartdocs_core::keys::join_url;
use smartdocs_core::types::ObjectRecord;

use crate::gateway::{GatewayResult, StorageGateway};

/// Filesystem-backed gateway: the container is a directory under `base_path`.
pub struct LocalGateway {
    root: PathBuf,
    container: String,
    name: String,
    public_base_url: Option<String>,
}

impl LocalGateway {
    pub fn new(base_path: &Path, container: &str, name: &str) -> smartdocs_core::error::Result<Self> {
        let root = base_path.join(container);
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            container: container.to_string(),
            name: name.to_string(),
            public_base_url: None,
        })
    }

    pub fn with_public_base_url(mut self, url: Option<String>) -> Self {
        self.public_base_url = url;
        self
    }

    fn object_path(&self, key: &str) -> GatewayResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('/')
            && !key.contains('\\')
            && key
                .split('/')
                .all(|part| !part.is_empty() && !part.starts_with('.'));
        if !valid {
            return Err(GatewayError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    async fn record_for(&self, key: String, path: &Path) -> GatewayResult<ObjectRecord> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| io_error(e, &key))?;
        let last_modified: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::from)
            .unwrap_or_else(|_| Utc::now());
        let access_url = self.resolve_access_url(&key);
        Ok(ObjectRecord {
            key,
            last_modified,
            size_bytes: metadata.len(),
            access_url,
        })
    }
}

#[async_trait]
impl StorageGateway for LocalGateway {
    async fn list(&self) -> GatewayResult<Vec<ObjectRecord>> {
        let mut records = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| io_error(e, &self.container))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| io_error(e, &self.container))?
            {
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| io_error(e, &self.container))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let Ok(relative) = path.strip_prefix(&self.root) else {
                        continue;
                    };
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    records.push(self.record_for(key, &path).await?);
                }
            }
        }

        Ok(records)
    }

    async fn head(&self, key: &str) -> GatewayResult<ObjectRecord> {
        let path = self.object_path(key)?;
        self.record_for(key.to_string(), &path).await
    }

    async fn write(&self, key: &str, data: Bytes, _content_type: &str) -> GatewayResult<()> {
        let path = self.object_path(key)?;
        let parent = path.parent().unwrap_or(&self.root).to_path_buf();
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| io_error(e, key))?;

        // Hidden temp file in the same directory, renamed into place once complete.
        let staging = parent.join(format!(".{}.part", uuid::Uuid::now_v7()));
        if let Err(e) = tokio::fs::write(&staging, &data).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(io_error(e, key));
        }
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(io_error(e, key));
        }
        Ok(())
    }

    fn resolve_access_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => join_url(base, key),
            None => join_url(&format!("file://{}", self.root.display()), key),
        }
    }

    async fn test_connection(&self) -> GatewayResult<()> {
        if !self.root.is_dir() {
            return Err(GatewayError::NotFound(format!(
                "Container directory does not exist: {}",
                self.root.display()
            )));
        }
        Ok(())
    }

    fn container(&self) -> &str {
        &self.container
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn io_error(err: std::io::Error, subject: &str) -> GatewayError {
    let message = format!("{subject}: {err}");
    match err.kind() {
        ErrorKind::NotFound => GatewayError::NotFound(message),
        ErrorKind::PermissionDenied => GatewayError::Unauthorized(message),
        ErrorKind::StorageFull | ErrorKind::QuotaExceeded | ErrorKind::FileTooLarge => {
            GatewayError::QuotaExceeded(message)
        }
        _ => GatewayError::NetworkFailure(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_then_list_and_head() {
        let tmp = TempDir::new().unwrap();
        let gateway = LocalGateway::new(tmp.path(), "rawinvoices", "test-local").unwrap();

        gateway
            .write("1-invoice.pdf", Bytes::from_static(b"%PDF-1.7"), "application/pdf")
            .await
            .unwrap();

        let records = gateway.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "1-invoice.pdf");
        assert_eq!(records[0].size_bytes, 8);

        let head = gateway.head("1-invoice.pdf").await.unwrap();
        assert_eq!(head, records[0]);
    }

    #[tokio::test]
    async fn nested_keys_use_forward_slashes() {
        let tmp = TempDir::new().unwrap();
        let gateway = LocalGateway::new(tmp.path(), "rawinvoices", "test-local").unwrap();
        gateway
            .write("2024/01/bill.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();

        let records = gateway.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "2024/01/bill.png");
    }

    #[tokio::test]
    async fn staging_files_are_not_listed() {
        let tmp = TempDir::new().unwrap();
        let gateway = LocalGateway::new(tmp.path(), "rawinvoices", "test-local").unwrap();
        std::fs::write(tmp.path().join("rawinvoices/.abc.part"), b"partial").unwrap();

        assert!(gateway.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let gateway = LocalGateway::new(tmp.path(), "rawinvoices", "test-local").unwrap();

        for key in ["../escape.pdf", "/abs.pdf", "a//b.pdf", ".hidden", ""] {
            let err = gateway
                .write(key, Bytes::from_static(b"x"), "application/pdf")
                .await
                .unwrap_err();
            assert!(matches!(err, GatewayError::InvalidKey(_)), "{key}: {err:?}");
        }
    }

    #[tokio::test]
    async fn missing_objects_and_containers_are_not_found() {
        let tmp = TempDir::new().unwrap();
        let gateway = LocalGateway::new(tmp.path(), "rawinvoices", "test-local").unwrap();
        assert!(matches!(
            gateway.head("nope.pdf").await,
            Err(GatewayError::NotFound(_))
        ));

        std::fs::remove_dir_all(tmp.path().join("rawinvoices")).unwrap();
        assert!(matches!(gateway.list().await, Err(GatewayError::NotFound(_))));
        assert!(gateway.test_connection().await.is_err());
    }

    #[test]
    fn access_urls() {
        let tmp = TempDir::new().unwrap();
        let gateway = LocalGateway::new(tmp.path(), "rawinvoices", "test-local").unwrap();
        let url = gateway.resolve_access_url("1-my invoice.pdf");
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/rawinvoices/1-my%20invoice.pdf"));

        let gateway = gateway.with_public_base_url(Some("https://files.example.com/inv".into()));
        assert_eq!(
            gateway.resolve_access_url("1-a.pdf"),
            "https://files.example.com/inv/1-a.pdf"
        );
    }
}
