//! Application configuration loaded from environment variables.

use common::UserId;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — Postgres connection string (unset means in-memory stores)
/// - `GATEWAY_BASE_URL` — invoice processor API base URL
/// - `GATEWAY_TOKEN` — invoice processor API token
/// - `ADMIN_IDS` — comma-separated numeric ids of shop administrators
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub gateway_base_url: Option<String>,
    pub gateway_token: Option<String>,
    pub admin_ids: Vec<UserId>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            gateway_base_url: std::env::var("GATEWAY_BASE_URL").ok(),
            gateway_token: std::env::var("GATEWAY_TOKEN").ok(),
            admin_ids: std::env::var("ADMIN_IDS")
                .map(|v| parse_admin_ids(&v))
                .unwrap_or_default(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            gateway_base_url: None,
            gateway_token: None,
            admin_ids: Vec::new(),
        }
    }
}

/// Parses a comma-separated admin id list, skipping malformed entries.
fn parse_admin_ids(raw: &str) -> Vec<UserId> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .map(UserId::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.admin_ids.is_empty());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_admin_id_parsing() {
        assert_eq!(
            parse_admin_ids("1, 42,777"),
            vec![UserId::new(1), UserId::new(42), UserId::new(777)]
        );
        assert_eq!(
            parse_admin_ids("7,oops,9"),
            vec![UserId::new(7), UserId::new(9)]
        );
        assert!(parse_admin_ids("").is_empty());
    }
}
