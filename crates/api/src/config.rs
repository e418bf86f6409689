//! Process configuration loaded from environment variables.

use std::time::Duration;

use store::PoolOptions;

/// Settings shared by every binary. Each binary reads only what it needs.
///
/// Environment variables:
/// - `HOST` bind address (default `"0.0.0.0"`)
/// - `PORT` listen port (default depends on the binary)
/// - `RUST_LOG` tracing filter directive (default `"info"`)
/// - `DATABASE_URL` PostgreSQL URL; unset runs on the in-memory store
/// - `DATABASE_MAX_CONNECTIONS` pool size (default 10)
/// - `CATALOG_SERVICE_URL`, `AUTH_SERVICE_URL`, `ORDERS_SERVICE_URL` service roots
/// - `CATALOG_TIMEOUT_MS` catalog lookup timeout (default 5000)
/// - `GATEWAY_TIMEOUT_MS` gateway upstream timeout (default 10000)
/// - `SESSION_TTL_SECS` login session lifetime (default 28800)
/// - `SESSION_SWEEP_SECS` interval between expired-session purges (default 600)
/// - `SEED_DEMO_DATA` seed the demo user and products (default false)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub catalog_service_url: String,
    pub auth_service_url: String,
    pub orders_service_url: String,
    pub catalog_timeout: Duration,
    pub gateway_timeout: Duration,
    pub session_ttl: Duration,
    pub session_sweep_interval: Duration,
    pub seed_demo_data: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env(default_port: u16) -> Self {
        Self::from_lookup(default_port, |key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// variables that are missing or do not parse.
    pub fn from_lookup<F>(default_port: u16, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::with_port(default_port);
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            catalog_service_url: lookup("CATALOG_SERVICE_URL")
                .unwrap_or(defaults.catalog_service_url),
            auth_service_url: lookup("AUTH_SERVICE_URL").unwrap_or(defaults.auth_service_url),
            orders_service_url: lookup("ORDERS_SERVICE_URL")
                .unwrap_or(defaults.orders_service_url),
            catalog_timeout: parsed("CATALOG_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.catalog_timeout),
            gateway_timeout: parsed("GATEWAY_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.gateway_timeout),
            session_ttl: parsed("SESSION_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            session_sweep_interval: parsed("SESSION_SWEEP_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_sweep_interval),
            seed_demo_data: lookup("SEED_DEMO_DATA")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.seed_demo_data),
        }
    }

    /// Defaults with the given listen port.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.database_max_connections,
            ..PoolOptions::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            database_max_connections: 10,
            catalog_service_url: "http://catalog-service:3002/catalog".to_string(),
            auth_service_url: "http://auth-service:3001/auth".to_string(),
            orders_service_url: "http://orders-service:3003/orders".to_string(),
            catalog_timeout: Duration::from_millis(5000),
            gateway_timeout: Duration::from_millis(10_000),
            session_ttl: Duration::from_secs(28_800),
            session_sweep_interval: Duration::from_secs(600),
            seed_demo_data: false,
        }
    }
}
