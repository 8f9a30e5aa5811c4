//! Error types for lock operations

use thiserror::Error;
use uuid::Uuid;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Typed outcomes of the lock protocol.
///
/// Every variant except `Store` and `Config` is a normal, recoverable protocol
/// answer. `Store` wraps opaque infrastructure failures from the backend.
#[derive(Error, Debug)]
pub enum LockError {
    /// A live lease already exists for the object
    #[error("object '{0}' is already locked")]
    AlreadyLocked(String),

    /// No row exists for the lock id
    #[error("lock {0} does not exist")]
    NonexistentLock(Uuid),

    /// The lease lapsed before it was renewed
    #[error("lock {0} has expired")]
    Expired(Uuid),

    /// The object is now held under another lock id
    #[error("lock {id} lost object '{locked_object}' to another holder")]
    RenewalError { id: Uuid, locked_object: String },

    /// Release of a lock that is not held
    #[error("lock {0} is not held")]
    NotLocked(Uuid),

    /// Lease length cannot be represented as a timestamp offset
    #[error("invalid max_age: {0} seconds")]
    InvalidMaxAge(u64),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl LockError {
    /// Whether the error means the caller no longer holds the lease
    pub fn is_lost_lease(&self) -> bool {
        matches!(
            self,
            LockError::NonexistentLock(_) | LockError::Expired(_) | LockError::RenewalError { .. }
        )
    }
}
