use std::path::PathBuf;
use std::time::Duration;

use storefront_catalog::config::{ConfigError, env_lookup, parse_var};

const DEV_JWT_SECRET: &str = "dev-secret";

/// Longest admin session: 30 days.
const MAX_ADMIN_TOKEN_TTL_MINS: i64 = 30 * 24 * 60;

/// Catalog service configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// JSON document holding the catalog (default: `products.json`).
    pub catalog_file: PathBuf,
    /// Ingest service endpoint. Without it, adds fail.
    pub ingest_url: Option<String>,
    pub ingest_timeout: Duration,
    pub jwt_secret: String,
    /// PHC-format argon2 hash of the admin password. Without it, login is disabled.
    pub admin_password_hash: Option<String>,
    pub admin_token_ttl: chrono::Duration,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
}

impl ApiConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default          |
    /// |-------------------------|------------------|
    /// | `HOST`                  | `0.0.0.0`        |
    /// | `PORT`                  | `8000`           |
    /// | `CATALOG_FILE`          | `products.json`  |
    /// | `INGEST_URL`            | unset            |
    /// | `INGEST_TIMEOUT_SECS`   | `30`             |
    /// | `ADMIN_JWT_SECRET`      | `dev-secret`     |
    /// | `ADMIN_PASSWORD_HASH`   | unset            |
    /// | `ADMIN_TOKEN_TTL_MINS`  | `60`             |
    /// | `CORS_ORIGINS`          | `*`              |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = set("ADMIN_JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("ADMIN_JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let admin_password_hash = set("ADMIN_PASSWORD_HASH");
        if admin_password_hash.is_none() {
            tracing::warn!("ADMIN_PASSWORD_HASH not set; admin login is disabled");
        }

        let ingest_url = set("INGEST_URL");
        if ingest_url.is_none() {
            tracing::warn!("INGEST_URL not set; adding products will fail");
        }

        let ttl_mins: i64 = parse_var(&lookup, "ADMIN_TOKEN_TTL_MINS", 60)?;
        if !(1..=MAX_ADMIN_TOKEN_TTL_MINS).contains(&ttl_mins) {
            return Err(ConfigError::Invalid {
                key: "ADMIN_TOKEN_TTL_MINS",
                value: ttl_mins.to_string(),
                reason: format!("must be between 1 and {MAX_ADMIN_TOKEN_TTL_MINS}"),
            });
        }
        let admin_token_ttl = chrono::Duration::try_minutes(ttl_mins).ok_or_else(|| ConfigError::Invalid {
            key: "ADMIN_TOKEN_TTL_MINS",
            value: ttl_mins.to_string(),
            reason: "out of range".to_string(),
        })?;

        let cors_origins = set("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: parse_var(&lookup, "HOST", "0.0.0.0".to_string())?,
            port: parse_var(&lookup, "PORT", 8000)?,
            catalog_file: PathBuf::from(parse_var(&lookup, "CATALOG_FILE", "products.json".to_string())?),
            ingest_url,
            ingest_timeout: Duration::from_secs(parse_var(&lookup, "INGEST_TIMEOUT_SECS", 30)?),
            jwt_secret,
            admin_password_hash,
            admin_token_ttl,
            cors_origins,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
