//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub billing: BillingConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

/// Billing-specific configuration
///
/// Per-merchant fee schedules live in the `merchant_billing` table; the
/// values here control invoice construction itself.
#[derive(Debug, Deserialize, Clone)]
pub struct BillingConfig {
    /// Invoice tax rate as a percentage (currently 0%, hook for VAT)
    #[serde(default = "default_tax_rate")]
    pub tax_rate_percent: f64,

    /// Payment terms: days between issue date and due date
    #[serde(default = "default_payment_terms")]
    pub payment_terms_days: i64,
}

fn default_tax_rate() -> f64 {
    0.0
}

fn default_payment_terms() -> i64 {
    30
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let mut builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("billing.tax_rate_percent", 0.0)?
            .set_default("billing.payment_terms_days", 30)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with PAYGATE_ prefix
            .add_source(
                Environment::with_prefix("PAYGATE")
                    .separator("__")
                    .try_parsing(true),
            );

        // Conventional DATABASE_URL wins over config files
        if let Ok(url) = env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }

        let config = builder.build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("PAYGATE").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            tax_rate_percent: 0.0,
            payment_terms_days: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_billing_config() {
        let config = BillingConfig::default();
        assert_eq!(config.tax_rate_percent, 0.0);
        assert_eq!(config.payment_terms_days, 30);
    }

    #[test]
    fn test_server_addr() {
        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 9001,
                workers: 1,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/paygate".to_string(),
                max_connections: 10,
                min_connections: 2,
            },
            billing: BillingConfig::default(),
        };
        assert_eq!(config.server_addr(), "127.0.0.1:9001");
    }
}
