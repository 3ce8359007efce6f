use thiserror::Error;

/// Errors raised by a [`crate::Partition`].
///
/// Wraps [`segment_store::SegmentError`] unchanged; a partition has no
/// failure modes of its own beyond what its segment store can raise.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error(transparent)]
    Segment(#[from] segment_store::SegmentError),
}

impl PartitionError {
    /// `true` if this error indicates on-disk corruption serious enough that
    /// the owning execution unit should abort rather than keep serving this
    /// partition.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Segment(e) => e.is_fatal(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PartitionError>;
