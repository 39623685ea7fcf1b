// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::time::Duration;

/// Version of this server build.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Idlemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Redis connection URL for the token cache
    pub redis_url: String,
    /// Lifetime of issued auth tokens
    pub token_ttl: Duration,
    /// Maximum open database connections
    pub max_db_connections: u32,
    /// Connection attempts before giving up at startup
    pub db_connect_retries: u32,
    /// Upper bound on a single locked update, including the wait for the row lock
    pub lock_timeout: Duration,
    /// Client version the server expects
    pub client_version: String,
    /// Run embedded migrations at startup
    pub run_migrations: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `IDLEMON_DATABASE_URL`: PostgreSQL connection string
    ///
    /// Optional (with defaults):
    /// - `IDLEMON_REDIS_URL`: Redis URL (default: redis://127.0.0.1:6379)
    /// - `IDLEMON_TOKEN_TTL_SECS`: token lifetime in seconds (default: 43200)
    /// - `IDLEMON_MAX_DB_CONNECTIONS`: pool size (default: 10)
    /// - `IDLEMON_DB_CONNECT_RETRIES`: startup connection attempts (default: 6)
    /// - `IDLEMON_LOCK_TIMEOUT_MS`: locked update timeout (default: 5000)
    /// - `IDLEMON_CLIENT_VERSION`: expected client version (default: 1.0.0)
    /// - `IDLEMON_RUN_MIGRATIONS`: `true`/`1` to migrate at startup (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("IDLEMON_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("IDLEMON_DATABASE_URL"))?;

        let redis_url = std::env::var("IDLEMON_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let token_ttl_secs: u64 = std::env::var("IDLEMON_TOKEN_TTL_SECS")
            .unwrap_or_else(|_| "43200".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("IDLEMON_TOKEN_TTL_SECS", "must be a positive integer")
            })?;
        if token_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "IDLEMON_TOKEN_TTL_SECS",
                "must be a positive integer",
            ));
        }

        let max_db_connections: u32 = std::env::var("IDLEMON_MAX_DB_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("IDLEMON_MAX_DB_CONNECTIONS", "must be a positive integer")
            })?;

        let db_connect_retries: u32 = std::env::var("IDLEMON_DB_CONNECT_RETRIES")
            .unwrap_or_else(|_| "6".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("IDLEMON_DB_CONNECT_RETRIES", "must be a positive integer")
            })?;

        let lock_timeout_ms: u64 = std::env::var("IDLEMON_LOCK_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("IDLEMON_LOCK_TIMEOUT_MS", "must be a positive integer")
            })?;
        if lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "IDLEMON_LOCK_TIMEOUT_MS",
                "must be a positive integer",
            ));
        }

        let client_version =
            std::env::var("IDLEMON_CLIENT_VERSION").unwrap_or_else(|_| "1.0.0".to_string());

        let run_migrations = std::env::var("IDLEMON_RUN_MIGRATIONS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        Ok(Self {
            database_url,
            redis_url,
            token_ttl: Duration::from_secs(token_ttl_secs),
            max_db_connections,
            db_connect_retries: db_connect_retries.max(1),
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            client_version,
            run_migrations,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const OPTIONAL_VARS: [&str; 7] = [
        "IDLEMON_REDIS_URL",
        "IDLEMON_TOKEN_TTL_SECS",
        "IDLEMON_MAX_DB_CONNECTIONS",
        "IDLEMON_DB_CONNECT_RETRIES",
        "IDLEMON_LOCK_TIMEOUT_MS",
        "IDLEMON_CLIENT_VERSION",
        "IDLEMON_RUN_MIGRATIONS",
    ];

    /// Helper to set env vars for a test and restore them after
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self { vars: Vec::new() }
        }

        fn set(&mut self, key: &str, value: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::set_var(key, value) };
        }

        fn remove(&mut self, key: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::remove_var(key) };
        }

        fn clear_optional(&mut self) {
            for key in OPTIONAL_VARS {
                self.remove(key);
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.drain(..).rev() {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(&key, v),
                        None => env::remove_var(&key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("IDLEMON_DATABASE_URL", "postgres://localhost/test");
        guard.clear_optional();

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, "postgres://localhost/test");
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.token_ttl, Duration::from_secs(12 * 60 * 60));
        assert_eq!(config.max_db_connections, 10);
        assert_eq!(config.db_connect_retries, 6);
        assert_eq!(config.lock_timeout, Duration::from_millis(5000));
        assert_eq!(config.client_version, "1.0.0");
        assert!(config.run_migrations);
    }

    #[test]
    fn test_config_from_env_all_custom() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("IDLEMON_DATABASE_URL", "postgres://user:pass@db:5432/prod");
        guard.set("IDLEMON_REDIS_URL", "redis://cache:6380");
        guard.set("IDLEMON_TOKEN_TTL_SECS", "600");
        guard.set("IDLEMON_MAX_DB_CONNECTIONS", "32");
        guard.set("IDLEMON_DB_CONNECT_RETRIES", "2");
        guard.set("IDLEMON_LOCK_TIMEOUT_MS", "250");
        guard.set("IDLEMON_CLIENT_VERSION", "2.3.1");
        guard.set("IDLEMON_RUN_MIGRATIONS", "false");

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, "postgres://user:pass@db:5432/prod");
        assert_eq!(config.redis_url, "redis://cache:6380");
        assert_eq!(config.token_ttl, Duration::from_secs(600));
        assert_eq!(config.max_db_connections, 32);
        assert_eq!(config.db_connect_retries, 2);
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.client_version, "2.3.1");
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_config_missing_database_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.remove("IDLEMON_DATABASE_URL");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("IDLEMON_DATABASE_URL")));
        assert!(err.to_string().contains("IDLEMON_DATABASE_URL"));
    }

    #[test]
    fn test_config_invalid_token_ttl() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("IDLEMON_DATABASE_URL", "postgres://localhost/test");
        guard.clear_optional();
        guard.set("IDLEMON_TOKEN_TTL_SECS", "twelve hours");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid("IDLEMON_TOKEN_TTL_SECS", _)
        ));
    }

    #[test]
    fn test_config_zero_token_ttl() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("IDLEMON_DATABASE_URL", "postgres://localhost/test");
        guard.clear_optional();
        guard.set("IDLEMON_TOKEN_TTL_SECS", "0");

        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("IDLEMON_TOKEN_TTL_SECS", _))
        ));
    }

    #[test]
    fn test_config_zero_lock_timeout() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("IDLEMON_DATABASE_URL", "postgres://localhost/test");
        guard.clear_optional();
        guard.set("IDLEMON_LOCK_TIMEOUT_MS", "0");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid("IDLEMON_LOCK_TIMEOUT_MS", "must be a positive integer")
        ));
    }

    #[test]
    fn test_config_negative_lock_timeout() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("IDLEMON_DATABASE_URL", "postgres://localhost/test");
        guard.clear_optional();
        guard.set("IDLEMON_LOCK_TIMEOUT_MS", "-5");

        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("IDLEMON_LOCK_TIMEOUT_MS", _))
        ));
    }

    #[test]
    fn test_config_zero_retries_still_tries_once() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("IDLEMON_DATABASE_URL", "postgres://localhost/test");
        guard.clear_optional();
        guard.set("IDLEMON_DB_CONNECT_RETRIES", "0");

        let config = Config::from_env().unwrap();
        assert_eq!(config.db_connect_retries, 1);
    }

    #[test]
    fn test_config_error_display() {
        let missing = ConfigError::Missing("MY_VAR");
        assert_eq!(
            missing.to_string(),
            "missing required environment variable: MY_VAR"
        );

        let invalid = ConfigError::Invalid("MY_VAR", "must be a number");
        assert_eq!(
            invalid.to_string(),
            "invalid value for MY_VAR: must be a number"
        );
    }
}
