use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, PricingConfig};
use crate::directory::{PartyDirectory, PermissiveDirectory};
use crate::error::AppError;
use crate::estimator::cache::EstimateCache;
use crate::estimator::{DeliveryEstimator, EstimatorService, HttpEstimator};
use crate::ledger::BookingLedger;
use crate::notify::NotificationHub;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub ledger: BookingLedger,
    pub estimator: EstimatorService,
    pub directory: Arc<dyn PartyDirectory>,
    pub notifier: NotificationHub,
    pub pricing: PricingConfig,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let timeout = Duration::from_millis(config.estimator_timeout_ms);

        let upstream = match &config.estimator_url {
            Some(url) => {
                let http = HttpEstimator::new(url.clone(), timeout)?;
                Some(Box::new(http) as Box<dyn DeliveryEstimator>)
            }
            None => None,
        };

        let estimator = EstimatorService::new(
            upstream,
            timeout,
            EstimateCache::new(
                config.estimate_cache_capacity,
                Duration::from_secs(config.estimate_cache_ttl_secs),
            ),
        );

        Ok(Self {
            ledger: BookingLedger::new(config.max_commit_retries),
            estimator,
            directory: Arc::new(PermissiveDirectory),
            notifier: NotificationHub::new(config.event_buffer_size),
            pricing: config.pricing.clone(),
            metrics: Metrics::new(),
        })
    }
}
