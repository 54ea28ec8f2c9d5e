// src/services/file_storage.rs
//! Local storage for uploaded resume files

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: PathBuf,
    pub size: i64,
}

/// Upload directory; every stored file gets a unique, sanitized name
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Write `bytes` as `{uuid}_{sanitized original name}`
    pub async fn save(&self, original_filename: &str, bytes: &[u8]) -> std::io::Result<StoredFile> {
        self.ensure_dir().await?;

        let sanitized = sanitize_filename(original_filename);
        let stored_name = if sanitized.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}_{}", Uuid::new_v4(), sanitized)
        };
        let path = self.dir.join(stored_name);

        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Stored uploaded file");

        Ok(StoredFile {
            path,
            size: bytes.len() as i64,
        })
    }

    /// Delete a stored file, logging instead of failing
    pub async fn remove_best_effort(path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed stored file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove stored file"),
        }
    }
}

/// Keep only characters that are safe in a file name
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("resume.pdf"), "resume.pdf");
        assert_eq!(sanitize_filename("../../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename("Jane Doe CV.docx"), "JaneDoeCV.docx");
    }

    #[tokio::test]
    async fn test_save_uses_unique_names_and_removal_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("uploads"));

        let first = storage.save("cv.pdf", b"one").await.unwrap();
        let second = storage.save("cv.pdf", b"two").await.unwrap();

        assert_ne!(first.path, second.path);
        assert_eq!(first.size, 3);
        assert!(first.path.to_string_lossy().ends_with("_cv.pdf"));
        assert_eq!(tokio::fs::read(&second.path).await.unwrap(), b"two");

        FileStorage::remove_best_effort(&first.path).await;
        assert!(!first.path.exists());
        FileStorage::remove_best_effort(&first.path).await;
    }
}
