//! Resource descriptor
//!
//! File metadata gathered once per request: size, modification time and a
//! content-type guess from the first bytes.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::SendError;
use crate::http::mime;

/// Immutable view of a file for the duration of one transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    path: PathBuf,
    size: u64,
    modified: DateTime<Utc>,
    content_type: &'static str,
}

impl ResourceDescriptor {
    /// Stat the file, check it can be read and sniff its content type
    ///
    /// Fails with [`SendError::NotReadable`] for missing files, directories
    /// and files the process may not read.
    pub async fn probe(path: impl AsRef<Path>) -> Result<Self, SendError> {
        let path = path.as_ref();
        let not_readable = |source: io::Error| SendError::NotReadable {
            path: path.to_path_buf(),
            source,
        };

        let meta = tokio::fs::metadata(path).await.map_err(not_readable)?;
        if !meta.is_file() {
            return Err(not_readable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        let mut file = File::open(path).await.map_err(not_readable)?;
        let mut head = Vec::with_capacity(mime::SNIFF_LEN);
        (&mut file)
            .take(mime::SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .await
            .map_err(not_readable)?;

        let extension = path.extension().and_then(|e| e.to_str());
        let modified = meta.modified().map(DateTime::<Utc>::from).unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            size: meta.len(),
            modified,
            content_type: mime::detect_content_type(&head, extension),
        })
    }

    /// Build a descriptor from known values, without touching the file system
    pub fn from_parts(
        path: impl Into<PathBuf>,
        size: u64,
        modified: DateTime<Utc>,
        content_type: &'static str,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            modified,
            content_type,
        }
    }

    /// Open the file for streaming
    ///
    /// The file was readable when probed; failing now is an
    /// [`SendError::OpenFailure`].
    pub async fn open(&self) -> Result<File, SendError> {
        File::open(&self.path)
            .await
            .map_err(|source| SendError::OpenFailure {
                path: self.path.clone(),
                source,
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity string fed into the validator
    pub fn identity(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub const fn size(&self) -> u64 {
        self.size
    }

    pub const fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// Detected content type, `application/octet-stream` when unknown
    pub const fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Last path component, used as the default disposition filename
    pub fn basename(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_probe_regular_file() {
        let mut tmp = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.5\nrest of document").unwrap();
        tmp.flush().unwrap();

        let res = ResourceDescriptor::probe(tmp.path()).await.unwrap();
        assert_eq!(res.size(), 25);
        assert_eq!(res.content_type(), "application/pdf");
        assert_eq!(res.path(), tmp.path());
        assert!(res.basename().unwrap().ends_with(".bin"));
        assert!(res.modified().timestamp() > 0);
    }

    #[tokio::test]
    async fn test_probe_falls_back_to_extension() {
        let mut tmp = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
        tmp.write_all(&[0, 1, 2, 3]).unwrap();
        tmp.flush().unwrap();

        let res = ResourceDescriptor::probe(tmp.path()).await.unwrap();
        assert_eq!(res.content_type(), "video/mp4");
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ResourceDescriptor::probe(dir.path().join("missing.txt"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.io_kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_probe_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = ResourceDescriptor::probe(dir.path()).await.unwrap_err();
        assert!(matches!(err, SendError::NotReadable { .. }));
    }

    #[tokio::test]
    async fn test_open_after_removal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vanishing.txt");
        std::fs::write(&path, b"soon gone").unwrap();

        let res = ResourceDescriptor::probe(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let err = res.open().await.unwrap_err();
        assert!(matches!(err, SendError::OpenFailure { .. }));
        assert!(!err.is_retryable());
    }
}
