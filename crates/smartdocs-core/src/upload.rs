//! Upload inputs and the local checks applied before anything reaches the store.

use bytes::Bytes;
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{Result, ValidationError};
use crate::keys::sanitize_filename;

/// A file the caller wants written to the container.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(name, content_type, data))
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Size and type limits for uploads.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_file_size: u64,
    accepted_types: BTreeSet<String>,
}

impl UploadPolicy {
    pub fn new(max_file_size: u64, accepted_types: impl IntoIterator<Item = String>) -> Self {
        Self {
            max_file_size,
            accepted_types: accepted_types
                .into_iter()
                .map(|t| essence(&t))
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn accepts(&self, content_type: &str) -> bool {
        self.accepted_types.contains(&essence(content_type))
    }

    /// Size limit alone, so a file on disk can be rejected from its metadata.
    pub fn check_size(&self, name: &str, size: u64) -> std::result::Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::TooLarge {
                name: name.to_string(),
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    pub fn validate(&self, file: &UploadFile) -> std::result::Result<(), ValidationError> {
        if sanitize_filename(&file.name).is_none() {
            return Err(ValidationError::InvalidName(file.name.clone()));
        }
        if file.data.is_empty() {
            return Err(ValidationError::EmptyFile(file.name.clone()));
        }
        self.check_size(&file.name, file.size_bytes())?;
        if !self.accepts(&file.content_type) {
            return Err(ValidationError::UnsupportedType {
                name: file.name.clone(),
                content_type: file.content_type.clone(),
            });
        }
        Ok(())
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        crate::config::UploadConfig::default().policy()
    }
}

/// `Application/PDF; charset=binary` -> `application/pdf`
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
