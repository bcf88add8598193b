//! Environment configuration

use anyhow::{Context, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Absent means the in-memory store is used.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub nats_url: Option<String>,
    pub port: u16,
    /// HS256 secret for bearer tokens. Without it no request can be authenticated.
    pub jwt_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let db_max_connections: u32 = match var("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().with_context(|| format!("DB_MAX_CONNECTIONS is not a number: {v}"))?,
            None => 10,
        };
        let port: u16 = match var("PORT") {
            Some(v) => v.parse().with_context(|| format!("PORT is not a valid port: {v}"))?,
            None => 8083,
        };
        Ok(Self { database_url: var("DATABASE_URL"), db_max_connections, nats_url: var("NATS_URL"), port, jwt_secret: var("JWT_SECRET") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.port, 8083);
        assert_eq!(c.db_max_connections, 10);
        assert!(c.database_url.is_none());
        assert!(c.jwt_secret.is_none());
    }

    #[test]
    fn test_values_and_blank_entries() {
        let c = config(&[("DATABASE_URL", "postgres://x"), ("PORT", "9000"), ("NATS_URL", "  "), ("DB_MAX_CONNECTIONS", "4")]).unwrap();
        assert_eq!(c.database_url.as_deref(), Some("postgres://x"));
        assert_eq!(c.port, 9000);
        assert_eq!(c.db_max_connections, 4);
        assert!(c.nats_url.is_none());
    }

    #[test]
    fn test_bad_numbers_are_errors() {
        assert!(config(&[("PORT", "http")]).is_err());
        assert!(config(&[("DB_MAX_CONNECTIONS", "-1")]).is_err());
    }
}
