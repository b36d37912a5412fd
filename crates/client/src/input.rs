//! Raw input files uploaded with a job.

use std::path::Path;

use surety_core::error::CoreError;
use surety_core::schema::{self, FileRole};

use crate::error::ClientError;

/// File name and contents of one CSV input, kept as raw bytes so the
/// upload is exactly what was read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, naming it after the path's final component.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            CoreError::Validation(format!("Cannot read input file {}: {e}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        tracing::debug!(file = %file_name, size = bytes.len(), "Loaded input file");
        Ok(Self { file_name, bytes })
    }

    pub fn text(&self) -> Result<&str, CoreError> {
        std::str::from_utf8(&self.bytes).map_err(|e| {
            CoreError::Validation(format!("{} is not valid UTF-8: {e}", self.file_name))
        })
    }

    /// Check the header row against the schema of `role`.
    pub fn validate(&self, role: FileRole) -> Result<(), CoreError> {
        schema::validate_bytes(&self.bytes, role)
    }
}
