//! services/api/src/adapters/storage.rs
//!
//! Local-disk implementation of the `FileStorage` port. Attachment paths are
//! stored relative to a single storage root.

use async_trait::async_trait;
use campus_ai_core::{FileStorage, PortError, PortResult, ResourceAttachment};
use std::path::{Component, Path, PathBuf};

#[derive(Clone, Debug)]
pub struct LocalStorageAdapter {
    root: PathBuf,
}

impl LocalStorageAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Joins a stored relative path onto the root. Paths that are absolute or
    /// climb out of the root are refused.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalStorageAdapter {
    async fn stage(&self, attachment: &ResourceAttachment) -> PortResult<PathBuf> {
        let path = self.resolve(&attachment.file_path).ok_or_else(|| {
            PortError::NotFound(format!(
                "Attachment {} has an invalid storage path",
                attachment.id
            ))
        })?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(PortError::NotFound(format!(
                "Attachment {} is not a file",
                attachment.id
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PortError::NotFound(
                format!("File for attachment {} not found", attachment.id),
            )),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }
}
