use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};

use petstore_observability::LogFormat;
use petstore_stores::MembershipPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory entity store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub customer_policy: MembershipPolicy,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("PETSTORE_BIND")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .context("PETSTORE_BIND must be a socket address such as 0.0.0.0:8080")?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let db_max_connections = lookup("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid u32")?;

        let customer_policy = match lookup("PETSTORE_CUSTOMER_POLICY") {
            Some(raw) => raw
                .parse::<MembershipPolicy>()
                .context("invalid PETSTORE_CUSTOMER_POLICY")?,
            None => MembershipPolicy::default(),
        };

        let log_format = match lookup("PETSTORE_LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .context("invalid PETSTORE_LOG_FORMAT")?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            database_url,
            db_max_connections,
            customer_policy,
            log_format,
        })
    }

    pub fn backend_name(&self) -> &'static str {
        match self.database_url {
            Some(_) => "postgres",
            None => "in_memory",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_select_in_memory_exclusive_policy() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.database_url, None);
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.customer_policy, MembershipPolicy::Exclusive);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.backend_name(), "in_memory");
    }

    #[test]
    fn reads_every_variable() {
        let config = config_from(&[
            ("PETSTORE_BIND", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://localhost/pet_store"),
            ("DB_MAX_CONNECTIONS", "12"),
            ("PETSTORE_CUSTOMER_POLICY", "member"),
            ("PETSTORE_LOG_FORMAT", "pretty"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/pet_store"));
        assert_eq!(config.db_max_connections, 12);
        assert_eq!(config.customer_policy, MembershipPolicy::Member);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.backend_name(), "postgres");
    }

    #[test]
    fn blank_database_url_means_in_memory() {
        let config = config_from(&[("DATABASE_URL", "  ")]).unwrap();
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(config_from(&[("DB_MAX_CONNECTIONS", "many")]).is_err());
        assert!(config_from(&[("PETSTORE_BIND", "localhost")]).is_err());
        assert!(config_from(&[("PETSTORE_CUSTOMER_POLICY", "any")]).is_err());
        assert!(config_from(&[("PETSTORE_LOG_FORMAT", "xml")]).is_err());
    }
}
