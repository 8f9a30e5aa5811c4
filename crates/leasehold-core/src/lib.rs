//! # Leasehold Core
//!
//! Lease-based, non-blocking mutual exclusion over a shared lock table.
//!
//! A lock is a row naming the protected object. Acquisition either writes the
//! row or fails at once with `AlreadyLocked`; there is no waiting. Leases may
//! carry a `max_age` after which they count as abandoned: an expired lease can
//! be superseded by a new acquisition, cannot be renewed, and is deleted by
//! reclamation.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use leasehold_core::{LockManager, LockSettings};
//! use leasehold_persistence::MemoryLockStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = LockManager::new(Arc::new(MemoryLockStore::new()));
//!
//! let mut lock = manager.acquire_lock("invoice:42", Some(30)).await?;
//! lock.renew().await?;
//! lock.release(true).await?;
//!
//! // Periodic job
//! manager.clean_expired_locks(&LockSettings::from_env()?).await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod error;
pub mod lock;
pub mod manager;
pub mod metrics;
pub mod naming;
pub mod reclaim;
pub mod settings;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LockError, LockResult};
pub use lock::{Lock, LockGuard};
pub use manager::LockManager;
pub use naming::{LockTarget, Lockable, NamingFn, default_lock_name};
pub use reclaim::{Reclaimer, ReclaimerHandle};
pub use settings::{DatabaseSettings, LockSettings};
