use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::estimator::{EstimateRequest, EstimateSource};
use crate::ledger::{codes, pricing};
use crate::models::booking::{Address, Booking, BookingStatus, Schedule, VehicleClass};
use crate::models::tracking::initial_steps;
use crate::notify::Notification;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub farmer_id: Uuid,
    pub vehicle_class: VehicleClass,
    #[serde(default)]
    pub vehicle_id: String,
    pub origin: Option<Address>,
    pub destination: Option<Address>,
    #[serde(default)]
    pub cargo: String,
    pub distance_km: Option<f64>,
    pub pickup_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

pub async fn create(state: &AppState, request: CreateBookingRequest) -> Result<Booking, AppError> {
    let origin = request
        .origin
        .ok_or_else(|| AppError::Validation("origin address is required".to_string()))?;
    let destination = request
        .destination
        .ok_or_else(|| AppError::Validation("destination address is required".to_string()))?;

    validate_address(&origin, "origin")?;
    validate_address(&destination, "destination")?;

    let postal_present = destination
        .postal_code
        .as_deref()
        .is_some_and(|postal| !postal.trim().is_empty());
    if !postal_present {
        return Err(AppError::Validation(
            "destination postal code is required".to_string(),
        ));
    }

    let cargo = request.cargo.trim().to_string();
    if cargo.is_empty() {
        return Err(AppError::Validation(
            "cargo description cannot be empty".to_string(),
        ));
    }

    let vehicle_id = request.vehicle_id.trim().to_string();
    if vehicle_id.is_empty() {
        return Err(AppError::Validation("vehicle id is required".to_string()));
    }

    let distance_km = request
        .distance_km
        .ok_or_else(|| AppError::Validation("distance_km is required".to_string()))?;
    if !distance_km.is_finite() || distance_km <= 0.0 {
        return Err(AppError::Validation(
            "distance_km must be a positive number".to_string(),
        ));
    }

    let pickup_at = request
        .pickup_at
        .ok_or_else(|| AppError::Validation("pickup date and time are required".to_string()))?;

    state.directory.validate_vehicle(&vehicle_id).await?;

    let fare = pricing::fare_for(&state.pricing, distance_km);

    let estimate_request = EstimateRequest {
        origin: origin.clone(),
        destination: destination.clone(),
        vehicle_class: request.vehicle_class,
        cargo_description: cargo.clone(),
        pickup_at,
    };
    let (hours, source) = state.estimator.estimate(&estimate_request).await;
    if source == EstimateSource::Heuristic && state.estimator.has_upstream() {
        state.metrics.estimator_fallbacks_total.inc();
    }

    let expected_delivery = pickup_at
        .checked_add_signed(Duration::hours(i64::from(hours)))
        .ok_or_else(|| {
            AppError::Validation("pickup is too far in the future to schedule".to_string())
        })?;

    let now = Utc::now();
    let booking = Booking {
        id: Uuid::new_v4(),
        code: codes::booking_code(now),
        tracking_token: codes::tracking_token(),
        farmer_id: request.farmer_id,
        driver_id: None,
        vehicle_id,
        vehicle_class: request.vehicle_class,
        origin,
        destination,
        cargo,
        notes: request.notes,
        fare,
        schedule: Schedule {
            pickup_at,
            expected_delivery,
            actual_delivery: None,
            rebaselined_delivery: None,
        },
        status: BookingStatus::Pending,
        steps: initial_steps(now),
        cancellation: None,
        overdue: false,
        last_location: None,
        version: 0,
        created_at: now,
        updated_at: now,
    };

    state.ledger.insert(booking.clone())?;
    state.metrics.bookings_created_total.inc();

    state.notifier.publish(Notification::transport(
        booking.farmer_id,
        "Booking received",
        format!(
            "Booking {} is registered and waiting for a driver.",
            booking.code
        ),
    ));

    info!(
        booking_code = %booking.code,
        farmer_id = %booking.farmer_id,
        estimated_hours = hours,
        estimate_source = ?source,
        "booking created"
    );

    Ok(booking)
}

fn validate_address(address: &Address, which: &str) -> Result<(), AppError> {
    if address.district.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "{which} district cannot be empty"
        )));
    }
    if address.state.trim().is_empty() {
        return Err(AppError::Validation(format!("{which} state cannot be empty")));
    }
    Ok(())
}
