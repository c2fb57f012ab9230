use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;

/// Filesystem area holding one attachment per document, keyed by the
/// document's canonical file name.
#[async_trait]
pub trait AttachmentStore: Send + Sync + 'static {
    /// Creates or overwrites the attachment and returns its absolute path.
    async fn store(&self, canonical_name: &str, bytes: Vec<u8>) -> Result<PathBuf>;

    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Removes the file if present. Missing files are not an error.
    async fn remove(&self, path: &Path) -> Result<()>;
}

pub struct LocalAttachmentStore {
    root: PathBuf,
}

impl LocalAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn store(&self, canonical_name: &str, bytes: Vec<u8>) -> Result<PathBuf> {
        let path = self.root.join(canonical_name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write attachment {}", path.display()))?;
        let absolute = path.canonicalize().unwrap_or(path);
        Ok(absolute)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read attachment {}", path.display()))
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "attachment already missing");
                Ok(())
            }
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove attachment {}", path.display()))
            }
        }
    }
}

/// Derives the stored file name from the document number plus the uploaded
/// file's extension, defaulting to `.txt` when the name carries none.
pub fn canonical_file_name(document_number: &str, original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| ".txt".to_string());
    format!("{document_number}{extension}")
}
