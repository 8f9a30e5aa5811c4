//! Leasehold Persistence - lock table entities and storage backends
//!
//! This crate provides:
//! - SeaORM entity definition for the lock table
//! - The `LockStore` trait the lock protocol is written against
//! - SQL backend (`ExternalDbLockStore`) and in-memory backend (`MemoryLockStore`)
//! - Domain model types shared by all backends

pub mod entity;
pub mod memory;
pub mod model;
pub mod sql;
pub mod traits;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export entity prelude
pub use entity::prelude::*;

pub use traits::LockStore;

pub use sql::{ExternalDbLockStore, PoolOptions};

pub use memory::MemoryLockStore;

pub use model::{InsertOutcome, LockRecord, StorageMode};
