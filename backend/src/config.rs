//! Configuration management for the kitchen stock service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with KITCHEN__ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub auth: AuthConfig,

    pub inventory: InventoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,

    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Secret used to verify bearer tokens
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Minimum threshold applied when a new item does not set one
    pub low_stock_default_threshold: Decimal,

    /// Run the expiry sweep right after a day is ended
    pub sweep_on_day_end: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("KITCHEN_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("inventory.low_stock_default_threshold", "0")?
            .set_default("inventory.sweep_on_day_end", false)?
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(
                Environment::with_prefix("KITCHEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
