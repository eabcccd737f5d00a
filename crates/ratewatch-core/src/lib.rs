//! Shared domain types and configuration for ratewatch.
//!
//! Everything here is plain data: hotel targets, price snapshots, run
//! statistics, the strategy selector, and the environment-driven
//! [`AppConfig`]. The scraping engine lives in `ratewatch-scraper`.

pub mod app_config;
mod config;
pub mod hotels;
pub mod snapshots;
pub mod strategy;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use hotels::{load_hotels, HotelTarget, HotelsFile};
pub use snapshots::{Currency, HotelError, PriceSnapshot, RunStats};
pub use strategy::StrategyMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read hotels file {path}: {source}")]
    HotelsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse hotels file: {0}")]
    HotelsFileParse(#[from] serde_yaml::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
