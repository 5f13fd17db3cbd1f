//! Client configuration from environment variables.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::client::RetryPolicy;
use crate::static_file::StaticLocation;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Read `key` through `lookup` and parse it, falling back to `default` when unset.
///
/// Blank values count as unset.
pub fn parse_var<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        },
        None => Ok(default),
    }
}

/// `std::env::var` as a lookup function.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Which catalog source the client talks to.
#[derive(Clone, PartialEq, Eq)]
pub enum SourceKind {
    Http {
        base_url: String,
        admin_token: Option<String>,
    },
    StaticFile {
        location: StaticLocation,
    },
}

/// Never prints the admin token.
impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Http { base_url, .. } => write!(f, "http {base_url}"),
            SourceKind::StaticFile { location } => write!(f, "static {location}"),
        }
    }
}

impl std::fmt::Debug for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Http { base_url, admin_token } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("admin_token", &admin_token.as_ref().map(|_| "<redacted>"))
                .finish(),
            SourceKind::StaticFile { location } => f.debug_struct("StaticFile").field("location", location).finish(),
        }
    }
}

/// Catalog client and refresher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub source: SourceKind,
    /// Upper bound on any single catalog call.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `CATALOG_SOURCE`             | `http` (or `static`)    |
    /// | `CATALOG_API_URL`            | `http://localhost:8000` |
    /// | `CATALOG_STATIC_LOCATION`    | `products.json`         |
    /// | `CATALOG_ADMIN_TOKEN`        | unset                   |
    /// | `CATALOG_TIMEOUT_SECS`       | `10`                    |
    /// | `CATALOG_MAX_RETRIES`        | `2`                     |
    /// | `CATALOG_POLL_INTERVAL_SECS` | `600`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind: String = parse_var(&lookup, "CATALOG_SOURCE", "http".to_string())?;
        let source = match kind.to_ascii_lowercase().as_str() {
            "http" => SourceKind::Http {
                base_url: parse_var(&lookup, "CATALOG_API_URL", "http://localhost:8000".to_string())?,
                admin_token: lookup("CATALOG_ADMIN_TOKEN").filter(|t| !t.trim().is_empty()),
            },
            "static" => {
                let raw: String = parse_var(&lookup, "CATALOG_STATIC_LOCATION", "products.json".to_string())?;
                SourceKind::StaticFile {
                    location: StaticLocation::parse(&raw),
                }
            }
            _ => {
                return Err(ConfigError::Invalid {
                    key: "CATALOG_SOURCE",
                    value: kind,
                    reason: "expected `http` or `static`".to_string(),
                });
            }
        };

        let timeout_secs: u64 = parse_var(&lookup, "CATALOG_TIMEOUT_SECS", 10)?;
        let max_retries: u32 = parse_var(&lookup, "CATALOG_MAX_RETRIES", 2)?;
        let poll_secs: u64 = parse_var(&lookup, "CATALOG_POLL_INTERVAL_SECS", 600)?;
        if poll_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "CATALOG_POLL_INTERVAL_SECS",
                value: poll_secs.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            source,
            timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy {
                max_retries,
                ..RetryPolicy::default()
            },
            poll_interval: Duration::from_secs(poll_secs),
        })
    }
}
