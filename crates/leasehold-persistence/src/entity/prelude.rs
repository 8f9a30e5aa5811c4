pub use super::non_blocking_lock::Entity as NonBlockingLock;
