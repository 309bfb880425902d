use crate::{
    error::{OracleError, Result},
    feeds::StaticDecimals,
    price_aggregator::{FailurePolicy, Statistic},
    types::AssetId,
    validator::{DEFAULT_MAX_CONF_WIDTH_BPS, DEFAULT_MAX_TIME_AHEAD},
    adapter::cached::DEFAULT_FEED_DECIMALS,
};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub server_host: String,

    /// Server port
    pub server_port: u16,

    /// JSON file describing assets and oracles
    pub oracle_config_path: String,

    /// Default tracing filter when RUST_LOG is unset
    pub log_filter: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: std::env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: std::env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            oracle_config_path: std::env::var("ORACLE_CONFIG_PATH")
                .unwrap_or_else(|_| "oracles.json".to_string()),
            log_filter: std::env::var("LOG_FILTER")
                .unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// The set of assets and oracles a service instance serves
#[derive(Debug, Clone, Deserialize)]
pub struct OracleSetConfig {
    pub assets: Vec<AssetConfig>,
    pub oracles: Vec<OracleDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    pub id: AssetId,
    pub decimals: u8,
}

/// One oracle entry. Cross and aggregate entries refer to oracles defined
/// earlier in the list by name.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OracleDefinition {
    PullFeed {
        name: String,
        feed_id: String,
        base: AssetId,
        quote: AssetId,
        max_staleness: u64,
        #[serde(default = "default_max_conf_width_bps")]
        max_conf_width_bps: u64,
        #[serde(default = "default_max_time_ahead")]
        max_time_ahead: u64,
    },
    CachedFeed {
        name: String,
        feed_id: String,
        base: AssetId,
        quote: AssetId,
        #[serde(default = "default_feed_decimals")]
        feed_decimals: u8,
        #[serde(default = "default_max_conf_width_bps")]
        max_conf_width_bps: u64,
        max_price_staleness: u64,
        max_cache_staleness: u64,
        #[serde(default = "default_max_time_ahead")]
        max_time_ahead: u64,
    },
    Cross {
        name: String,
        base: AssetId,
        cross: AssetId,
        quote: AssetId,
        first: String,
        second: String,
    },
    Aggregate {
        name: String,
        base: AssetId,
        quote: AssetId,
        sources: Vec<String>,
        #[serde(default)]
        statistic: Statistic,
        #[serde(default)]
        failure_policy: FailurePolicy,
    },
}

impl OracleDefinition {
    pub fn name(&self) -> &str {
        match self {
            OracleDefinition::PullFeed { name, .. }
            | OracleDefinition::CachedFeed { name, .. }
            | OracleDefinition::Cross { name, .. }
            | OracleDefinition::Aggregate { name, .. } => name,
        }
    }
}

fn default_max_conf_width_bps() -> u64 {
    DEFAULT_MAX_CONF_WIDTH_BPS
}

fn default_feed_decimals() -> u8 {
    DEFAULT_FEED_DECIMALS
}

fn default_max_time_ahead() -> u64 {
    DEFAULT_MAX_TIME_AHEAD
}

impl OracleSetConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| OracleError::ParseError(format!("Invalid oracle config: {}", e)))
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| OracleError::ParseError(format!("Cannot read {}: {}", path, e)))?;
        Self::from_json(&json)
    }

    pub fn decimals(&self) -> StaticDecimals {
        self.assets
            .iter()
            .fold(StaticDecimals::new(), |decimals, asset| {
                decimals.with(asset.id.clone(), asset.decimals)
            })
    }
}

pub fn parse_feed_id(feed_id: &str) -> Result<Pubkey> {
    Pubkey::from_str(feed_id)
        .map_err(|e| OracleError::ParseError(format!("Invalid pubkey {}: {}", feed_id, e)))
}
