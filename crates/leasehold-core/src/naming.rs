//! Lock name resolution
//!
//! A lock protects a `locked_object` string. Callers either pass that string
//! directly or pass an object that knows its type and identity, which the
//! manager's naming function turns into a string (`"<type>:<id>"` by default).

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// An object that can be locked by identity
pub trait Lockable {
    /// Type part of the lock name, e.g. `"User"`
    fn lock_type(&self) -> &str;

    /// Identity part of the lock name, e.g. the primary key
    fn lock_id(&self) -> String;
}

/// Naming function installed on a `LockManager`
pub type NamingFn = Arc<dyn Fn(&dyn Lockable) -> String + Send + Sync>;

/// Default naming convention: `"<type>:<id>"`
pub fn default_lock_name(object: &dyn Lockable) -> String {
    format!("{}:{}", object.lock_type(), object.lock_id())
}

/// What to lock: an explicit name or an object to derive one from
#[derive(Clone)]
pub enum LockTarget<'a> {
    Name(Cow<'a, str>),
    Object(&'a dyn Lockable),
}

impl<'a> LockTarget<'a> {
    pub fn name(name: impl Into<Cow<'a, str>>) -> Self {
        LockTarget::Name(name.into())
    }

    pub fn object(object: &'a dyn Lockable) -> Self {
        LockTarget::Object(object)
    }

    /// Resolve the `locked_object` key
    pub fn resolve(&self, naming: &NamingFn) -> String {
        match self {
            LockTarget::Name(name) => name.to_string(),
            LockTarget::Object(object) => naming(*object),
        }
    }
}

impl fmt::Debug for LockTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockTarget::Name(name) => f.debug_tuple("Name").field(name).finish(),
            LockTarget::Object(object) => f
                .debug_tuple("Object")
                .field(&default_lock_name(*object))
                .finish(),
        }
    }
}

impl<'a> From<&'a str> for LockTarget<'a> {
    fn from(name: &'a str) -> Self {
        LockTarget::Name(Cow::Borrowed(name))
    }
}

impl From<String> for LockTarget<'static> {
    fn from(name: String) -> Self {
        LockTarget::Name(Cow::Owned(name))
    }
}

impl<'a, T: Lockable> From<&'a T> for LockTarget<'a> {
    fn from(object: &'a T) -> Self {
        LockTarget::Object(object)
    }
}
