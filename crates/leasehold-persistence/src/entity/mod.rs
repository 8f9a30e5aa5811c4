//! SeaORM entity definitions for the lock table

pub mod prelude;

pub mod non_blocking_lock;
