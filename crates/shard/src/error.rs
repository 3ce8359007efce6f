use thiserror::Error;

/// Errors raised by a [`crate::ShardManager`] or [`crate::Dispatcher`].
#[derive(Debug, Error)]
pub enum ShardError {
    #[error(transparent)]
    Partition(#[from] partition::PartitionError),

    /// The execution unit owning this request has stopped responding,
    /// typically because it aborted after a fatal [`partition::PartitionError`].
    #[error("execution unit is unavailable")]
    UnitUnavailable,
}

impl ShardError {
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Partition(e) => e.is_fatal(),
            Self::UnitUnavailable => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShardError>;
