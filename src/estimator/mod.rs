pub mod cache;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::AppError;
use crate::estimator::cache::{EstimateCache, RouteKey};
use crate::models::booking::{Address, VehicleClass};

pub const MIN_ESTIMATE_HOURS: u32 = 2;
pub const MAX_ESTIMATE_HOURS: u32 = 168;

#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("estimator timed out")]
    Timeout,

    #[error("estimator request failed: {0}")]
    Upstream(String),

    #[error("estimator returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl From<EstimatorError> for AppError {
    fn from(err: EstimatorError) -> Self {
        AppError::UpstreamUnavailable(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EstimateRequest {
    pub origin: Address,
    pub destination: Address,
    pub vehicle_class: VehicleClass,
    pub cargo_description: String,
    pub pickup_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateSource {
    Cache,
    Upstream,
    Heuristic,
}

#[async_trait]
pub trait DeliveryEstimator: Send + Sync {
    async fn estimate_hours(&self, request: &EstimateRequest) -> Result<u32, EstimatorError>;
}

pub struct HeuristicEstimator;

impl HeuristicEstimator {
    pub fn corridor_hours(origin: &Address, destination: &Address) -> u32 {
        let same_state = eq_fold(&origin.state, &destination.state);
        let same_district = same_state && eq_fold(&origin.district, &destination.district);

        if same_district {
            4
        } else if same_state {
            12
        } else {
            24
        }
    }

    pub fn estimate(request: &EstimateRequest) -> u32 {
        let base = Self::corridor_hours(&request.origin, &request.destination) as f64;
        (base * request.vehicle_class.journey_factor()).round() as u32
    }
}

fn eq_fold(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

pub struct HttpEstimator {
    client: reqwest::Client,
    url: String,
}

impl HttpEstimator {
    pub fn new(url: String, timeout: Duration) -> Result<Self, EstimatorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EstimatorError::Upstream(err.to_string()))?;

        Ok(Self { client, url })
    }
}

#[derive(Deserialize)]
struct EstimateResponse {
    estimated_hours: f64,
}

#[async_trait]
impl DeliveryEstimator for HttpEstimator {
    async fn estimate_hours(&self, request: &EstimateRequest) -> Result<u32, EstimatorError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    EstimatorError::Timeout
                } else {
                    EstimatorError::Upstream(err.to_string())
                }
            })?
            .error_for_status()
            .map_err(|err| EstimatorError::Upstream(err.to_string()))?;

        let body: EstimateResponse = response
            .json()
            .await
            .map_err(|err| EstimatorError::InvalidResponse(err.to_string()))?;

        if !body.estimated_hours.is_finite() || body.estimated_hours <= 0.0 {
            return Err(EstimatorError::InvalidResponse(format!(
                "estimated_hours out of range: {}",
                body.estimated_hours
            )));
        }

        Ok(body.estimated_hours.round() as u32)
    }
}

pub struct EstimatorService {
    upstream: Option<Box<dyn DeliveryEstimator>>,
    timeout: Duration,
    cache: EstimateCache,
}

impl EstimatorService {
    pub fn new(
        upstream: Option<Box<dyn DeliveryEstimator>>,
        timeout: Duration,
        cache: EstimateCache,
    ) -> Self {
        Self {
            upstream,
            timeout,
            cache,
        }
    }

    pub fn has_upstream(&self) -> bool {
        self.upstream.is_some()
    }

    pub async fn estimate(&self, request: &EstimateRequest) -> (u32, EstimateSource) {
        let key = RouteKey::new(&request.origin, &request.destination, request.vehicle_class);

        if let Some(hours) = self.cache.get(&key) {
            return (hours, EstimateSource::Cache);
        }

        if let Some(upstream) = &self.upstream {
            match tokio::time::timeout(self.timeout, upstream.estimate_hours(request)).await {
                Ok(Ok(hours)) => {
                    let hours = clamp_hours(hours);
                    self.cache.put(key, hours);
                    return (hours, EstimateSource::Upstream);
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "estimator failed, using corridor heuristic");
                }
                Err(_) => {
                    warn!(
                        timeout_ms = self.timeout.as_millis() as u64,
                        "estimator timed out, using corridor heuristic"
                    );
                }
            }
        }

        (
            clamp_hours(HeuristicEstimator::estimate(request)),
            EstimateSource::Heuristic,
        )
    }

    pub fn invalidate_cache(&self) -> usize {
        self.cache.clear()
    }

    pub fn invalidate_route(
        &self,
        origin: &Address,
        destination: &Address,
        vehicle_class: VehicleClass,
    ) -> bool {
        self.cache
            .invalidate(&RouteKey::new(origin, destination, vehicle_class))
    }
}

pub fn clamp_hours(hours: u32) -> u32 {
    hours.clamp(MIN_ESTIMATE_HOURS, MAX_ESTIMATE_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(district: &str, state: &str) -> Address {
        Address {
            line: "market road".to_string(),
            district: district.to_string(),
            state: state.to_string(),
            postal_code: Some("680001".to_string()),
        }
    }

    fn request(
        origin_district: &str,
        origin_state: &str,
        dest_district: &str,
        dest_state: &str,
        class: VehicleClass,
    ) -> EstimateRequest {
        EstimateRequest {
            origin: address(origin_district, origin_state),
            destination: address(dest_district, dest_state),
            vehicle_class: class,
            cargo_description: "bananas".to_string(),
            pickup_at: Utc::now(),
        }
    }

    struct FixedEstimator(u32);

    #[async_trait]
    impl DeliveryEstimator for FixedEstimator {
        async fn estimate_hours(&self, _request: &EstimateRequest) -> Result<u32, EstimatorError> {
            Ok(self.0)
        }
    }

    struct FailingEstimator;

    #[async_trait]
    impl DeliveryEstimator for FailingEstimator {
        async fn estimate_hours(&self, _request: &EstimateRequest) -> Result<u32, EstimatorError> {
            Err(EstimatorError::Upstream("boom".to_string()))
        }
    }

    struct SlowEstimator;

    #[async_trait]
    impl DeliveryEstimator for SlowEstimator {
        async fn estimate_hours(&self, _request: &EstimateRequest) -> Result<u32, EstimatorError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(90)
        }
    }

    fn service(upstream: Option<Box<dyn DeliveryEstimator>>) -> EstimatorService {
        EstimatorService::new(
            upstream,
            Duration::from_millis(200),
            EstimateCache::new(16, Duration::from_secs(60)),
        )
    }

    #[test]
    fn corridor_hours_follow_district_and_state() {
        let svc = |o_d, o_s, d_d, d_s| {
            HeuristicEstimator::corridor_hours(&address(o_d, o_s), &address(d_d, d_s))
        };
        assert_eq!(svc("Thrissur", "Kerala", "Thrissur", "Kerala"), 4);
        assert_eq!(svc("Ernakulam", "Kerala", "Thrissur", "Kerala"), 12);
        assert_eq!(svc("Ernakulam", "Kerala", "Coimbatore", "Tamil Nadu"), 24);
        assert_eq!(svc("Bilaspur", "Chhattisgarh", "Bilaspur", "Himachal Pradesh"), 24);
    }

    #[test]
    fn heuristic_scales_by_vehicle_class() {
        let tractor = request("Ernakulam", "Kerala", "Thrissur", "Kerala", VehicleClass::Tractor);
        let truck = request("Ernakulam", "Kerala", "Thrissur", "Kerala", VehicleClass::Truck);
        assert_eq!(HeuristicEstimator::estimate(&tractor), 19);
        assert_eq!(HeuristicEstimator::estimate(&truck), 12);
    }

    #[test]
    fn clamp_keeps_hours_in_contract_range() {
        assert_eq!(clamp_hours(0), MIN_ESTIMATE_HOURS);
        assert_eq!(clamp_hours(12), 12);
        assert_eq!(clamp_hours(4000), MAX_ESTIMATE_HOURS);
    }

    #[tokio::test]
    async fn upstream_result_is_cached() {
        let svc = service(Some(Box::new(FixedEstimator(30))));
        let req = request("Ernakulam", "Kerala", "Thrissur", "Kerala", VehicleClass::Truck);

        let (hours, source) = svc.estimate(&req).await;
        assert_eq!((hours, source), (30, EstimateSource::Upstream));

        let (hours, source) = svc.estimate(&req).await;
        assert_eq!((hours, source), (30, EstimateSource::Cache));

        assert_eq!(svc.invalidate_cache(), 1);
        let (_, source) = svc.estimate(&req).await;
        assert_eq!(source, EstimateSource::Upstream);
    }

    #[tokio::test]
    async fn upstream_failure_degrades_to_heuristic() {
        let svc = service(Some(Box::new(FailingEstimator)));
        let req = request("Ernakulam", "Kerala", "Thrissur", "Kerala", VehicleClass::Truck);

        let (hours, source) = svc.estimate(&req).await;
        assert_eq!((hours, source), (12, EstimateSource::Heuristic));

        let (_, source) = svc.estimate(&req).await;
        assert_eq!(source, EstimateSource::Heuristic);
    }

    #[tokio::test]
    async fn slow_upstream_times_out_to_heuristic() {
        let svc = service(Some(Box::new(SlowEstimator)));
        let req = request("Ernakulam", "Kerala", "Thrissur", "Kerala", VehicleClass::Truck);

        let started = std::time::Instant::now();
        let (hours, source) = svc.estimate(&req).await;
        assert_eq!((hours, source), (12, EstimateSource::Heuristic));
        assert!(started.elapsed() < Duration::from_secs(2));

        let (_, source) = svc.estimate(&req).await;
        assert_eq!(source, EstimateSource::Heuristic);
    }

    #[tokio::test]
    async fn invalidate_route_drops_a_single_route() {
        let svc = service(Some(Box::new(FixedEstimator(30))));
        let kochi = request("Ernakulam", "Kerala", "Thrissur", "Kerala", VehicleClass::Truck);
        let palakkad = request("Palakkad", "Kerala", "Thrissur", "Kerala", VehicleClass::Truck);
        svc.estimate(&kochi).await;
        svc.estimate(&palakkad).await;

        assert!(svc.invalidate_route(&kochi.origin, &kochi.destination, kochi.vehicle_class));
        assert!(!svc.invalidate_route(&kochi.origin, &kochi.destination, kochi.vehicle_class));

        let (_, source) = svc.estimate(&kochi).await;
        assert_eq!(source, EstimateSource::Upstream);
        let (_, source) = svc.estimate(&palakkad).await;
        assert_eq!(source, EstimateSource::Cache);
    }

    #[tokio::test]
    async fn missing_upstream_uses_heuristic_directly() {
        let svc = service(None);
        assert!(!svc.has_upstream());

        let req = request("Ernakulam", "Kerala", "Coimbatore", "Tamil Nadu", VehicleClass::Lorry);
        let (hours, source) = svc.estimate(&req).await;
        assert_eq!(source, EstimateSource::Heuristic);
        assert_eq!(hours, 29);
    }
}
