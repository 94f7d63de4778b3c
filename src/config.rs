use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub base_price: f64,
    pub price_per_km: f64,
    pub handling_fee: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_price: 500.0,
            price_per_km: 15.0,
            handling_fee: 100.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub sweep_interval_secs: u64,
    pub estimator_url: Option<String>,
    pub estimator_timeout_ms: u64,
    pub estimate_cache_capacity: usize,
    pub estimate_cache_ttl_secs: u64,
    pub max_commit_retries: u32,
    pub pricing: PricingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            event_buffer_size: 1024,
            sweep_interval_secs: 300,
            estimator_url: None,
            estimator_timeout_ms: 800,
            estimate_cache_capacity: 256,
            estimate_cache_ttl_secs: 900,
            max_commit_retries: 3,
            pricing: PricingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Config::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            sweep_interval_secs: parse_or_default(
                "SWEEP_INTERVAL_SECS",
                defaults.sweep_interval_secs,
            )?,
            estimator_url: env::var("ESTIMATOR_URL").ok().filter(|url| !url.is_empty()),
            estimator_timeout_ms: parse_or_default(
                "ESTIMATOR_TIMEOUT_MS",
                defaults.estimator_timeout_ms,
            )?,
            estimate_cache_capacity: parse_or_default(
                "ESTIMATE_CACHE_CAPACITY",
                defaults.estimate_cache_capacity,
            )?,
            estimate_cache_ttl_secs: parse_or_default(
                "ESTIMATE_CACHE_TTL_SECS",
                defaults.estimate_cache_ttl_secs,
            )?,
            max_commit_retries: parse_or_default("MAX_COMMIT_RETRIES", defaults.max_commit_retries)?,
            pricing: PricingConfig {
                base_price: parse_or_default("BASE_PRICE", defaults.pricing.base_price)?,
                price_per_km: parse_or_default("PRICE_PER_KM", defaults.pricing.price_per_km)?,
                handling_fee: parse_or_default("HANDLING_FEE", defaults.pricing.handling_fee)?,
            },
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
