use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use super::StoreError;

/// First bytes of every well-formed PDF file.
pub const PDF_MAGIC: &[u8; 5] = b"%PDF-";

/// Uploaded files, written under `<media_root>/documents/`.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a blob store rooted at `media_root`.
    pub fn new(media_root: impl Into<PathBuf>) -> Self {
        Self {
            root: media_root.into().join("documents"),
        }
    }

    /// Persist `bytes` under a unique name derived from `original_name`.
    ///
    /// The returned path is absolute, so stored records resolve regardless of the working
    /// directory of whichever process reads them later.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let root = tokio::fs::canonicalize(&self.root).await?;
        let path = root.join(format!(
            "{}_{}",
            uuid::Uuid::new_v4().simple(),
            sanitize_file_name(original_name)
        ));
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Stored upload");
        Ok(path)
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, path: &Path) -> Result<(), StoreError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

/// Check whether the file at `path` starts with the PDF magic bytes.
pub async fn has_pdf_magic(path: &Path) -> std::io::Result<bool> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut header = [0u8; 5];
    let mut filled = 0;
    while filled < header.len() {
        let read = file.read(&mut header[filled..]).await?;
        if read == 0 {
            return Ok(false);
        }
        filled += read;
    }
    Ok(&header == PDF_MAGIC)
}

fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned
    }
}
