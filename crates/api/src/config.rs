//! Startup configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Which record store backs the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// In-process store, optionally seeded from a JSON fixture file.
    InMemory { fixtures: Option<PathBuf> },
    Postgres { database_url: String },
}

impl StoreConfig {
    pub fn label(&self) -> &'static str {
        match self {
            StoreConfig::InMemory { .. } => "in_memory",
            StoreConfig::Postgres { .. } => "postgres",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreConfig,
    /// Service default for counting unbilled sales orders as outstanding.
    pub include_unbilled: bool,
}

impl ApiConfig {
    /// Reads `BIND_ADDR`, `USE_PERSISTENT_STORES`, `DATABASE_URL`,
    /// `CREDIT_INCLUDE_UNBILLED` and `CREDIT_FIXTURES`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR must be a socket address such as 0.0.0.0:8080")?;

        let persistent = flag(&lookup, "USE_PERSISTENT_STORES")?;
        let store = if persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;
            StoreConfig::Postgres { database_url }
        } else {
            StoreConfig::InMemory {
                fixtures: lookup("CREDIT_FIXTURES")
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from),
            }
        };

        Ok(Self {
            bind_addr,
            store,
            include_unbilled: flag(&lookup, "CREDIT_INCLUDE_UNBILLED")?,
        })
    }
}

/// Unset means false; anything other than a recognised boolean is an error.
fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<bool> {
    let Some(raw) = lookup(key) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => bail!("{key} must be a boolean (true/false), got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ApiConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_to_in_memory_without_unbilled() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(cfg.store, StoreConfig::InMemory { fixtures: None });
        assert!(!cfg.include_unbilled);
    }

    #[test]
    fn persistent_store_requires_database_url() {
        let err = config(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let cfg = config(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/tillcredit"),
        ])
        .unwrap();
        assert_eq!(cfg.store.label(), "postgres");
    }

    #[test]
    fn fixtures_and_unbilled_flag_are_read() {
        let cfg = config(&[
            ("CREDIT_FIXTURES", "/etc/tillcredit/seed.json"),
            ("CREDIT_INCLUDE_UNBILLED", "YES"),
            ("BIND_ADDR", "127.0.0.1:9000"),
        ])
        .unwrap();
        assert_eq!(
            cfg.store,
            StoreConfig::InMemory { fixtures: Some(PathBuf::from("/etc/tillcredit/seed.json")) }
        );
        assert!(cfg.include_unbilled);
        assert_eq!(cfg.bind_addr.port(), 9000);
    }

    #[test]
    fn invalid_values_fail_startup() {
        assert!(config(&[("CREDIT_INCLUDE_UNBILLED", "maybe")]).is_err());
        assert!(config(&[("BIND_ADDR", "localhost")]).is_err());
    }
}
