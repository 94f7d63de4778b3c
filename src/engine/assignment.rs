use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::sequencer;
use crate::engine::status;
use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::cancellation::{ActorRef, ActorRole, CancellationRequest, CancellationStatus};
use crate::models::tracking::{StepName, StepStatus};
use crate::notify::Notification;
use crate::state::AppState;

pub async fn assign(
    state: &AppState,
    booking_id: Uuid,
    driver_id: Uuid,
) -> Result<Booking, AppError> {
    state.directory.validate_driver(driver_id).await?;

    let updated = state.ledger.update_with(booking_id, |booking| {
        match booking.status {
            BookingStatus::Pending | BookingStatus::Confirmed => {}
            status => {
                return Err(AppError::InvalidState(format!(
                    "booking {} cannot take a driver while {status}",
                    booking.code
                )));
            }
        }

        booking.driver_id = Some(driver_id);

        let placed = booking.step_mut(StepName::OrderPlaced);
        if placed.status != StepStatus::Completed {
            placed.status = StepStatus::Completed;
            placed.completed_at = Some(Utc::now());
        }
        booking.step_mut(StepName::OrderAccepted).status = StepStatus::Current;

        status::reproject(booking);
        Ok(())
    })?;

    state.notifier.publish(Notification::transport(
        driver_id,
        "New booking assigned",
        format!(
            "Booking {} from {} to {} is waiting for your acceptance.",
            updated.code, updated.origin.district, updated.destination.district
        ),
    ));

    info!(booking_code = %updated.code, driver_id = %driver_id, "driver assigned");

    Ok(updated)
}

pub async fn accept(
    state: &AppState,
    booking_id: Uuid,
    driver_id: Uuid,
) -> Result<Booking, AppError> {
    let updated = state.ledger.update_with(booking_id, |booking| {
        if booking.driver_id != Some(driver_id) {
            return Err(AppError::Forbidden(format!(
                "driver {driver_id} is not assigned to booking {}",
                booking.code
            )));
        }
        if booking.status != BookingStatus::Confirmed {
            return Err(AppError::InvalidState(format!(
                "booking {} must be confirmed before acceptance, found {}",
                booking.code, booking.status
            )));
        }

        sequencer::complete_step(booking, StepName::OrderAccepted, Utc::now(), None, None)?;
        status::reproject(booking);
        Ok(())
    })?;

    state.notifier.publish(Notification::transport(
        updated.farmer_id,
        "Driver accepted",
        format!(
            "Your driver accepted booking {} and will start the pickup soon.",
            updated.code
        ),
    ));

    info!(booking_code = %updated.code, driver_id = %driver_id, "driver accepted booking");

    Ok(updated)
}

pub async fn reject(
    state: &AppState,
    booking_id: Uuid,
    driver_id: Uuid,
    reason: String,
) -> Result<Booking, AppError> {
    let updated = state.ledger.update_with(booking_id, |booking| {
        if booking.driver_id != Some(driver_id) {
            return Err(AppError::Forbidden(format!(
                "driver {driver_id} is not assigned to booking {}",
                booking.code
            )));
        }
        if booking.status != BookingStatus::Confirmed {
            return Err(AppError::InvalidState(format!(
                "booking {} must be confirmed before rejection, found {}",
                booking.code, booking.status
            )));
        }

        let now = Utc::now();
        let driver = ActorRef {
            role: ActorRole::Driver,
            id: driver_id,
        };
        booking.cancellation = Some(CancellationRequest {
            requested_by: driver,
            requested_at: now,
            reason: reason.clone(),
            status: CancellationStatus::Approved,
            reviewed_by: Some(driver),
            reviewed_at: Some(now),
            review_notes: None,
        });

        status::reproject(booking);
        Ok(())
    })?;

    state.notifier.publish(Notification::transport(
        updated.farmer_id,
        "Booking cancelled",
        format!("The driver declined booking {}: {reason}", updated.code),
    ));

    info!(
        booking_code = %updated.code,
        driver_id = %driver_id,
        reason = %reason,
        "driver rejected booking"
    );

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ledger::create::{create, CreateBookingRequest};
    use crate::models::booking::{Address, VehicleClass};

    fn valid_request() -> CreateBookingRequest {
        CreateBookingRequest {
            farmer_id: Uuid::new_v4(),
            vehicle_class: VehicleClass::MiniTruck,
            vehicle_id: "KL-40-AB-7788".to_string(),
            origin: Some(Address {
                line: "Farm gate".to_string(),
                district: "Palakkad".to_string(),
                state: "Kerala".to_string(),
                postal_code: Some("678001".to_string()),
            }),
            destination: Some(Address {
                line: "Wholesale market".to_string(),
                district: "Palakkad".to_string(),
                state: "Kerala".to_string(),
                postal_code: Some("678002".to_string()),
            }),
            cargo: "12 sacks of rice".to_string(),
            distance_km: Some(18.0),
            pickup_at: Some(Utc::now()),
            notes: None,
        }
    }

    async fn pending_booking() -> (AppState, Uuid) {
        let state = AppState::new(&Config::default()).unwrap();
        let booking = create(&state, valid_request()).await.unwrap();
        (state, booking.id)
    }

    #[tokio::test]
    async fn assign_confirms_and_opens_acceptance() {
        let (state, id) = pending_booking().await;
        let driver = Uuid::new_v4();

        let updated = assign(&state, id, driver).await.unwrap();

        assert_eq!(updated.status, BookingStatus::Confirmed);
        assert_eq!(updated.driver_id, Some(driver));
        assert_eq!(
            updated.step(StepName::OrderAccepted).status,
            StepStatus::Current
        );
    }

    #[tokio::test]
    async fn drivers_can_be_swapped_until_acceptance() {
        let (state, id) = pending_booking().await;
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assign(&state, id, first).await.unwrap();
        let updated = assign(&state, id, second).await.unwrap();
        assert_eq!(updated.driver_id, Some(second));

        accept(&state, id, second).await.unwrap();
        let result = assign(&state, id, first).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn accept_completes_the_gate_step() {
        let (state, id) = pending_booking().await;
        let driver = Uuid::new_v4();
        assign(&state, id, driver).await.unwrap();

        let updated = accept(&state, id, driver).await.unwrap();

        assert_eq!(updated.status, BookingStatus::Accepted);
        assert!(updated.step_completed(StepName::OrderAccepted));
        assert_eq!(
            updated.step(StepName::PickupStarted).status,
            StepStatus::Current
        );
    }

    #[tokio::test]
    async fn only_the_bound_driver_may_accept() {
        let (state, id) = pending_booking().await;
        assign(&state, id, Uuid::new_v4()).await.unwrap();

        let result = accept(&state, id, Uuid::new_v4()).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        let booking = state.ledger.snapshot(id).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn accept_requires_an_assignment_first() {
        let (state, id) = pending_booking().await;

        let result = accept(&state, id, Uuid::new_v4()).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn reject_ends_the_booking() {
        let (state, id) = pending_booking().await;
        let driver = Uuid::new_v4();
        assign(&state, id, driver).await.unwrap();

        let updated = reject(&state, id, driver, "vehicle breakdown".to_string())
            .await
            .unwrap();

        assert_eq!(updated.status, BookingStatus::Cancelled);
        let record = updated.cancellation.unwrap();
        assert_eq!(record.status, CancellationStatus::Approved);
        assert_eq!(record.requested_by.role, ActorRole::Driver);
        assert_eq!(record.reviewed_by.map(|r| r.id), Some(driver));

        let result = accept(&state, id, driver).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }
}
