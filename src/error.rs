//! Transmission errors

use std::io;
use std::path::PathBuf;

/// Failure while preparing or streaming a file
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// File missing or unreadable, raised before any header is emitted
    #[error("file not found or inaccessible: {}", path.display())]
    NotReadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Open failed after the readability check, headers may already be committed
    #[error("can not open file: {}", path.display())]
    OpenFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Read, seek or write failure while streaming
    #[error("transfer I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SendError {
    /// True when nothing was sent yet and another resource can be tried
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReadable { .. })
    }

    /// Kind of the underlying I/O error
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::NotReadable { source, .. } | Self::OpenFailure { source, .. } => source.kind(),
            Self::Io(e) => e.kind(),
        }
    }
}
