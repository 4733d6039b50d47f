//! Configuration loading from the process environment.

use chrono::Duration;
use thiserror::Error;

pub const CART_TTL_VAR: &str = "STOREFRONT_CART_TTL_SECS";
pub const PERSISTENT_VAR: &str = "USE_PERSISTENT_STORES";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const CART_LOCKED_VAR: &str = "STOREFRONT_CART_LOCKED";

/// Carts expire 30 minutes after their last change unless configured.
pub const DEFAULT_CART_TTL_SECS: i64 = 30 * 60;

/// Upper bound on the cart TTL: one year.
pub const MAX_CART_TTL_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    pub cart_ttl: Duration,
    /// Postgres URL when persistent stores are enabled; in-memory otherwise.
    pub database_url: Option<String>,
    /// Initial state of the cart lock.
    pub cart_locked: bool,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            cart_ttl: Duration::seconds(DEFAULT_CART_TTL_SECS),
            database_url: None,
            cart_locked: false,
        }
    }
}

impl StorefrontConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cart_ttl = match lookup(CART_TTL_VAR) {
            Some(raw) => {
                let secs = raw.trim().parse::<i64>().map_err(|_| ConfigError::Invalid {
                    var: CART_TTL_VAR,
                    value: raw.clone(),
                    reason: "expected a whole number of seconds",
                })?;
                if secs <= 0 {
                    return Err(ConfigError::Invalid {
                        var: CART_TTL_VAR,
                        value: raw,
                        reason: "must be positive",
                    });
                }
                if secs > MAX_CART_TTL_SECS {
                    return Err(ConfigError::Invalid {
                        var: CART_TTL_VAR,
                        value: raw,
                        reason: "must be at most one year",
                    });
                }
                Duration::try_seconds(secs).ok_or_else(|| ConfigError::Invalid {
                    var: CART_TTL_VAR,
                    value: raw.clone(),
                    reason: "out of range",
                })?
            }
            None => Duration::seconds(DEFAULT_CART_TTL_SECS),
        };

        let persistent = parse_flag(PERSISTENT_VAR, lookup(PERSISTENT_VAR))?;
        let database_url = if persistent {
            match lookup(DATABASE_URL_VAR) {
                Some(url) if !url.trim().is_empty() => Some(url),
                _ => return Err(ConfigError::Missing(DATABASE_URL_VAR)),
            }
        } else {
            None
        };

        let cart_locked = parse_flag(CART_LOCKED_VAR, lookup(CART_LOCKED_VAR))?;

        Ok(Self {
            cart_ttl,
            database_url,
            cart_locked,
        })
    }

    pub fn is_persistent(&self) -> bool {
        self.database_url.is_some()
    }
}

fn parse_flag(var: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: "expected a boolean",
        }),
    }
}
