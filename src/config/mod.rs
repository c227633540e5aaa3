//! Environment-backed configuration for external collaborators.
//!
//! Collaborators receive their configuration explicitly at construction;
//! nothing reads the environment after startup.

use std::env;

/// Binance REST API configuration
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub base_url: String,
}

impl BinanceConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("BINANCE_BASE_URL")
                .unwrap_or_else(|_| "https://api.binance.com".to_string()),
        }
    }
}

/// MediaStack news API configuration
#[derive(Debug, Clone)]
pub struct MediaStackConfig {
    pub base_url: String,
    pub access_key: String,
}

impl MediaStackConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("MEDIASTACK_BASE_URL")
                .unwrap_or_else(|_| "http://api.mediastack.com/v1".to_string()),
            access_key: env::var("MEDIASTACK_ACCESS_KEY").unwrap_or_default(),
        }
    }
}

/// Aggregated application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub binance: BinanceConfig,
    pub mediastack: MediaStackConfig,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            binance: BinanceConfig::from_env(),
            mediastack: MediaStackConfig::from_env(),
        }
    }
}
