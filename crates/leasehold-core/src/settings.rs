//! Lock settings loaded from config files and environment
//!
//! Recognised keys (environment variables use the `LOCK_` prefix, so
//! `LOCK_MAX_AGE` maps to `max_age`):
//!
//! | Key                 | Meaning                                                 |
//! |---------------------|---------------------------------------------------------|
//! | `max_age`           | Implicit lease length for locks acquired without one    |
//! | `reclaim_interval`  | Seconds between sweeps of a `Reclaimer` (default 60)    |
//! | `db.url`            | Lock database URL                                       |
//! | `db.max_connections`| Pool size (default 10)                                  |
//! | `db.min_connections`| Idle pool floor (default 1)                             |
//! | `db.connect_timeout`| Seconds (default 30)                                    |
//! | `db.sqlx_logging`   | Log every statement (default false)                     |

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use config::{Config, ConfigError, Environment, File};
use leasehold_persistence::PoolOptions;

use crate::error::{LockError, LockResult};

pub const LOCK_MAX_AGE_PROPERTY: &str = "max_age";
pub const RECLAIM_INTERVAL_PROPERTY: &str = "reclaim_interval";
pub const DB_URL_PROPERTY: &str = "db.url";

const DEFAULT_RECLAIM_INTERVAL_SECS: u64 = 60;

/// Settings that govern reclamation of abandoned leases.
///
/// These are plain values handed to `LockManager::clean_expired_locks`, not
/// process-wide state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockSettings {
    /// Implicit lease length in seconds for locks acquired without a
    /// `max_age`. `None` and `Some(0)` both disable implicit reclamation.
    pub max_age: Option<u64>,
    /// Period of the background reclaimer
    pub reclaim_interval: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            max_age: None,
            reclaim_interval: Duration::from_secs(DEFAULT_RECLAIM_INTERVAL_SECS),
        }
    }
}

impl LockSettings {
    /// Settings with an implicit max age, everything else default
    pub fn with_max_age(max_age: u64) -> Self {
        Self {
            max_age: Some(max_age),
            ..Default::default()
        }
    }

    /// Load from `LOCK_*` environment variables
    pub fn from_env() -> LockResult<Self> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("lock").try_parsing(true))
            .build()?;
        Self::from_config(&config)
    }

    /// Load from a config file, overridden by `LOCK_*` environment variables
    pub fn from_file(path: &str) -> LockResult<Self> {
        Self::from_file_and_env(path, Environment::with_prefix("lock").try_parsing(true))
    }

    fn from_file_and_env(path: &str, env: Environment) -> LockResult<Self> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(env)
            .build()?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> LockResult<Self> {
        let max_age = optional_seconds(config, LOCK_MAX_AGE_PROPERTY)?;

        let reclaim_interval = match optional_seconds(config, RECLAIM_INTERVAL_PROPERTY)? {
            Some(0) => {
                return Err(ConfigError::Message(format!(
                    "{RECLAIM_INTERVAL_PROPERTY} must be greater than zero"
                ))
                .into());
            }
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(DEFAULT_RECLAIM_INTERVAL_SECS),
        };

        Ok(Self {
            max_age,
            reclaim_interval,
        })
    }

    /// The implicit max age when implicit reclamation is enabled
    pub fn implicit_max_age(&self) -> Option<u64> {
        self.max_age.filter(|&secs| secs > 0)
    }

    /// Unbounded leases last renewed at or before this instant are reclaimed
    pub fn implicit_cutoff(&self, now: DateTime<Utc>) -> LockResult<Option<DateTime<Utc>>> {
        let Some(secs) = self.implicit_max_age() else {
            return Ok(None);
        };
        let age = i64::try_from(secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or(LockError::InvalidMaxAge(secs))?;
        // A cutoff before the representable range reclaims nothing
        Ok(Some(now.checked_sub_signed(age).unwrap_or(DateTime::<Utc>::MIN_UTC)))
    }
}

/// Connection settings for the lock database
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub sqlx_logging: bool,
}

impl DatabaseSettings {
    pub fn from_config(config: &Config) -> LockResult<Self> {
        let url = config.get_string(DB_URL_PROPERTY)?;
        let max_connections = optional_count(config, "db.max_connections")?.unwrap_or(10);
        let min_connections = optional_count(config, "db.min_connections")?.unwrap_or(1);
        let connect_timeout = optional_seconds(config, "db.connect_timeout")?.unwrap_or(30);
        let sqlx_logging = match config.get_bool("db.sqlx_logging") {
            Ok(enabled) => enabled,
            Err(ConfigError::NotFound(_)) => false,
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            url,
            max_connections,
            min_connections,
            connect_timeout: Duration::from_secs(connect_timeout),
            sqlx_logging,
        })
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout: self.connect_timeout,
            sqlx_logging: self.sqlx_logging,
        }
    }
}

fn optional_seconds(config: &Config, key: &str) -> LockResult<Option<u64>> {
    match config.get_int(key) {
        Ok(secs) if secs < 0 => Err(ConfigError::Message(format!(
            "{key} must be a non-negative number of seconds, got {secs}"
        ))
        .into()),
        Ok(secs) => Ok(Some(secs as u64)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn optional_count(config: &Config, key: &str) -> LockResult<Option<u32>> {
    match config.get_int(key) {
        Ok(count) => u32::try_from(count).map(Some).map_err(|_| {
            ConfigError::Message(format!("{key} must be between 0 and {}, got {count}", u32::MAX))
                .into()
        }),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
