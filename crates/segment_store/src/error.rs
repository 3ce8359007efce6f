use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the segment store.
///
/// [`SegmentError::Corrupt`] and [`SegmentError::MissingSidecar`] are the
/// two *fatal* kinds described in the engine's error model: a short record
/// inside a segment file, or a value mention with no backing sidecar, both
/// indicate on-disk data loss rather than a transient condition. Callers
/// above the partition boundary treat them as reasons to abort the owning
/// execution unit rather than return a normal error to the client.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt segment file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("missing value sidecar for key in segment {path}")]
    MissingSidecar { path: PathBuf },
}

impl SegmentError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// `true` for the two fatal-corruption kinds the engine's error model
    /// says should abort the owning execution unit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Corrupt { .. } | Self::MissingSidecar { .. })
    }
}

pub type Result<T> = std::result::Result<T, SegmentError>;
