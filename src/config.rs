use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::aggregator::RetryPolicy;
use crate::projector::{EarningsRates, DEFAULT_GAS_PER_UNIT, DEFAULT_USD_PER_UNIT};

#[derive(Debug, Clone)]
pub struct Config {
    pub etherscan_api_key: String,
    pub etherscan_api_url: String,
    pub growth_data_path: PathBuf,
    pub http_bind_addr: String,
    pub gas_per_unit: f64,
    pub usd_per_unit: f64,
    pub rate_limit_backoff: Duration,
    pub rate_limit_max_attempts: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing ETHERSCAN_API_KEY env var")]
    MissingApiKey,
    #[error("{var} must be a positive number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let etherscan_api_key = env::var("ETHERSCAN_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        let etherscan_api_url = env::var("ETHERSCAN_API_URL")
            .unwrap_or_else(|_| "https://api.etherscan.io/api".to_string());
        let growth_data_path = env::var("GROWTH_DATA_PATH")
            .unwrap_or_else(|_| "data/total_gas_usage.csv".to_string())
            .into();
        let http_bind_addr = env::var("HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let gas_per_unit = positive_var("GAS_PER_FTN", DEFAULT_GAS_PER_UNIT)?;
        let usd_per_unit = positive_var("FTN_USD_PRICE", DEFAULT_USD_PER_UNIT)?;
        let backoff_ms: u64 = positive_var("RATE_LIMIT_BACKOFF_MS", 1000)?;
        let rate_limit_max_attempts = positive_var("RATE_LIMIT_MAX_ATTEMPTS", 10)?;

        Ok(Self {
            etherscan_api_key,
            etherscan_api_url,
            growth_data_path,
            http_bind_addr,
            gas_per_unit,
            usd_per_unit,
            rate_limit_backoff: Duration::from_millis(backoff_ms),
            rate_limit_max_attempts,
        })
    }

    pub fn rates(&self) -> EarningsRates {
        EarningsRates::new(self.gas_per_unit, self.usd_per_unit)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            backoff: self.rate_limit_backoff,
            max_attempts: self.rate_limit_max_attempts,
        }
    }
}

fn positive_var<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    match env::var(var) {
        Ok(raw) => parse_positive(var, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_positive<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|v| *v > T::default())
        .ok_or_else(|| ConfigError::InvalidNumber {
            var,
            value: raw.to_string(),
        })
}
