use std::str::FromStr;

use warden_core::session::{
    SessionConfig, DEFAULT_ACCESS_TTL_SECS, DEFAULT_MAX_SESSIONS, DEFAULT_REFRESH_TTL_SECS,
    MAX_TTL_SECS,
};

use crate::auth::jwt::JwtConfig;

/// Startup configuration errors. Any of these aborts the process.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// PostgreSQL connection settings. Absent when `DATABASE_URL` is unset, in
/// which case the server runs on in-memory stores.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on draining in-flight requests after a shutdown signal.
    pub shutdown_timeout_secs: u64,
    pub database: Option<DatabaseConfig>,
    /// JWT secret and token lifetimes.
    pub jwt: JwtConfig,
    /// Maximum concurrently active sessions per user (default: `5`).
    pub max_sessions: usize,
    /// Create the well-known roles and one user per role at startup.
    pub seed_dev_users: bool,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                   | Default       |
    /// |---------------------------|---------------|
    /// | `HOST`                    | `0.0.0.0`     |
    /// | `PORT`                    | `3000`        |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`          |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`          |
    /// | `DATABASE_URL`            | in-memory     |
    /// | `DB_MAX_CONNECTIONS`      | `20`          |
    /// | `DB_ACQUIRE_TIMEOUT_SECS` | `5`           |
    /// | `JWT_SECRET`              | **required**  |
    /// | `JWT_ACCESS_TTL_SECS`     | `900`         |
    /// | `JWT_REFRESH_TTL_SECS`    | `604800`      |
    /// | `MAX_SESSIONS`            | `5`           |
    /// | `SEED_DEV_USERS`          | `false`       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&lookup, "PORT", 3000u16)?;
        let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30u64)?;
        let shutdown_timeout_secs = parse_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30u64)?;

        let database = match lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 20u32)?,
                acquire_timeout_secs: parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 5u64)?,
            }),
            None => None,
        };

        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let jwt = JwtConfig {
            secret,
            access_ttl_secs: parse_ttl(&lookup, "JWT_ACCESS_TTL_SECS", DEFAULT_ACCESS_TTL_SECS)?,
            refresh_ttl_secs: parse_ttl(&lookup, "JWT_REFRESH_TTL_SECS", DEFAULT_REFRESH_TTL_SECS)?,
        };

        let max_sessions = parse_or(&lookup, "MAX_SESSIONS", DEFAULT_MAX_SESSIONS)?;
        let seed_dev_users = parse_or(&lookup, "SEED_DEV_USERS", false)?;

        let config = Self {
            host,
            port,
            request_timeout_secs,
            shutdown_timeout_secs,
            database,
            jwt,
            max_sessions,
            seed_dev_users,
        };

        config
            .session_config()
            .validate()
            .map_err(|e| ConfigError::Invalid {
                var: "MAX_SESSIONS / JWT_*_TTL_SECS",
                value: format!(
                    "{} / {} / {}",
                    config.max_sessions, config.jwt.access_ttl_secs, config.jwt.refresh_ttl_secs
                ),
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Session cap and token lifetimes derived from this configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_sessions: self.max_sessions,
            access_ttl: ttl(self.jwt.access_ttl_secs),
            refresh_ttl: ttl(self.jwt.refresh_ttl_secs),
        }
    }
}

// Out-of-range values are clamped just past the bound so `validate` rejects them.
fn ttl(secs: i64) -> chrono::Duration {
    chrono::Duration::seconds(secs.clamp(-MAX_TTL_SECS - 1, MAX_TTL_SECS + 1))
}

fn parse_ttl<F>(lookup: &F, var: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parse_or(lookup, var, default)?;
    if !(1..=MAX_TTL_SECS).contains(&secs) {
        return Err(ConfigError::Invalid {
            var,
            value: secs.to_string(),
            reason: format!("must be between 1 and {MAX_TTL_SECS} seconds"),
        });
    }
    Ok(secs)
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.database.is_none());
        assert_eq!(config.jwt.access_ttl_secs, 900);
        assert_eq!(config.jwt.refresh_ttl_secs, 604_800);
        assert_eq!(config.max_sessions, 5);
        assert!(!config.seed_dev_users);
    }

    #[test]
    fn secret_is_required() {
        assert_matches!(load(&[]), Err(ConfigError::Missing("JWT_SECRET")));
        assert_matches!(
            load(&[("JWT_SECRET", "")]),
            Err(ConfigError::Missing("JWT_SECRET"))
        );
    }

    #[test]
    fn database_settings_follow_url() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("DATABASE_URL", "postgres://localhost/warden"),
            ("DB_MAX_CONNECTIONS", "7"),
        ])
        .unwrap();
        let db = config.database.unwrap();
        assert_eq!(db.max_connections, 7);
        assert_eq!(db.acquire_timeout_secs, 5);
    }

    #[test]
    fn malformed_numbers_fail() {
        assert_matches!(
            load(&[("JWT_SECRET", "s"), ("PORT", "eighty")]),
            Err(ConfigError::Invalid { var: "PORT", .. })
        );
    }

    #[test]
    fn session_policy_is_validated() {
        assert_matches!(
            load(&[("JWT_SECRET", "s"), ("MAX_SESSIONS", "0")]),
            Err(ConfigError::Invalid { .. })
        );
        assert_matches!(
            load(&[
                ("JWT_SECRET", "s"),
                ("JWT_ACCESS_TTL_SECS", "600"),
                ("JWT_REFRESH_TTL_SECS", "60"),
            ]),
            Err(ConfigError::Invalid { .. })
        );
    }

    #[test]
    fn oversized_ttls_are_rejected() {
        assert_matches!(
            load(&[("JWT_SECRET", "s"), ("JWT_REFRESH_TTL_SECS", "10000000000000")]),
            Err(ConfigError::Invalid { var: "JWT_REFRESH_TTL_SECS", .. })
        );
        assert_matches!(
            load(&[("JWT_SECRET", "s"), ("JWT_ACCESS_TTL_SECS", "9223372036854775807")]),
            Err(ConfigError::Invalid { var: "JWT_ACCESS_TTL_SECS", .. })
        );
        assert_matches!(
            load(&[("JWT_SECRET", "s"), ("JWT_ACCESS_TTL_SECS", "-5")]),
            Err(ConfigError::Invalid { var: "JWT_ACCESS_TTL_SECS", .. })
        );
    }

    #[test]
    fn session_config_never_panics_on_raw_values() {
        let mut config = load(&[("JWT_SECRET", "s")]).unwrap();
        config.jwt.refresh_ttl_secs = i64::MAX;
        assert!(config.session_config().validate().is_err());
    }
}
