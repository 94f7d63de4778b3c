use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::status;
use crate::error::AppError;
use crate::models::booking::Booking;
use crate::models::cancellation::{
    ActorRef, ActorRole, CancellationRequest, CancellationStatus, ReviewDecision,
};
use crate::models::tracking::StepName;
use crate::notify::Notification;
use crate::state::AppState;

pub async fn request(
    state: &AppState,
    booking_id: Uuid,
    requested_by: ActorRef,
    reason: String,
) -> Result<Booking, AppError> {
    let reason = reason.trim().to_string();
    if reason.is_empty() {
        return Err(AppError::Validation(
            "a cancellation reason is required".to_string(),
        ));
    }

    let updated = state.ledger.update_with(booking_id, |booking| {
        if booking.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "booking {} is already {}",
                booking.code, booking.status
            )));
        }
        if booking.step_completed(StepName::OrderPickedUp) {
            return Err(AppError::InvalidState(format!(
                "booking {} is past pickup and can no longer be cancelled",
                booking.code
            )));
        }
        if booking.cancellation.is_some() {
            return Err(AppError::Conflict(format!(
                "booking {} already has a cancellation request",
                booking.code
            )));
        }

        booking.cancellation = Some(CancellationRequest::pending(
            requested_by,
            reason.clone(),
            Utc::now(),
        ));
        status::reproject(booking);
        Ok(())
    })?;

    if let Some(counterparty) = counterparty_of(&updated, requested_by.role) {
        state.notifier.publish(Notification::transport(
            counterparty,
            "Cancellation requested",
            format!(
                "Booking {} has a cancellation request under review.",
                updated.code
            ),
        ));
    }

    info!(
        booking_code = %updated.code,
        requested_by = %requested_by.id,
        role = ?requested_by.role,
        "cancellation requested"
    );

    Ok(updated)
}

pub async fn review(
    state: &AppState,
    booking_id: Uuid,
    reviewer: ActorRef,
    decision: ReviewDecision,
    notes: Option<String>,
) -> Result<Booking, AppError> {
    let updated = state.ledger.update_with(booking_id, |booking| {
        let Some(record) = booking.cancellation.as_mut() else {
            return Err(AppError::InvalidState(format!(
                "booking {} has no cancellation request",
                booking.code
            )));
        };
        if record.status != CancellationStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "cancellation for booking {} was already reviewed",
                booking.code
            )));
        }

        record.status = match decision {
            ReviewDecision::Approved => CancellationStatus::Approved,
            ReviewDecision::Denied => CancellationStatus::Denied,
        };
        record.reviewed_by = Some(reviewer);
        record.reviewed_at = Some(Utc::now());
        record.review_notes = notes.clone();

        status::reproject(booking);
        Ok(())
    })?;

    let outcome = match decision {
        ReviewDecision::Approved => "approved",
        ReviewDecision::Denied => "denied",
    };

    if let Some(record) = &updated.cancellation {
        let requester = record.requested_by;
        state.notifier.publish(Notification::transport(
            requester.id,
            "Cancellation reviewed",
            format!(
                "Your cancellation request for booking {} was {outcome}.",
                updated.code
            ),
        ));
        if let Some(counterparty) = counterparty_of(&updated, requester.role) {
            state.notifier.publish(Notification::transport(
                counterparty,
                "Cancellation reviewed",
                format!(
                    "The cancellation request for booking {} was {outcome}.",
                    updated.code
                ),
            ));
        }
    }

    info!(
        booking_code = %updated.code,
        decision = outcome,
        reviewer = %reviewer.id,
        "cancellation reviewed"
    );

    Ok(updated)
}

fn counterparty_of(booking: &Booking, requester: ActorRole) -> Option<Uuid> {
    match requester {
        ActorRole::Farmer | ActorRole::Admin => booking.driver_id,
        ActorRole::Driver => Some(booking.farmer_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::{assignment, sequencer};
    use crate::models::booking::{Address, BookingStatus, VehicleClass};
    use crate::ledger::create::{create, CreateBookingRequest};

    fn valid_request() -> CreateBookingRequest {
        CreateBookingRequest {
            farmer_id: Uuid::new_v4(),
            vehicle_class: VehicleClass::Lorry,
            vehicle_id: "KA-01-LH-3344".to_string(),
            origin: Some(Address {
                line: "Cold store".to_string(),
                district: "Kolar".to_string(),
                state: "Karnataka".to_string(),
                postal_code: Some("563101".to_string()),
            }),
            destination: Some(Address {
                line: "City market".to_string(),
                district: "Bengaluru Urban".to_string(),
                state: "Karnataka".to_string(),
                postal_code: Some("560002".to_string()),
            }),
            cargo: "3 tons of tomatoes".to_string(),
            distance_km: Some(70.0),
            pickup_at: Some(Utc::now()),
            notes: None,
        }
    }

    async fn accepted_booking() -> (AppState, Uuid, Uuid, Uuid) {
        let state = AppState::new(&Config::default()).unwrap();
        let booking = create(&state, valid_request()).await.unwrap();
        let farmer = booking.farmer_id;
        let driver = Uuid::new_v4();
        assignment::assign(&state, booking.id, driver).await.unwrap();
        assignment::accept(&state, booking.id, driver).await.unwrap();
        (state, booking.id, farmer, driver)
    }

    fn farmer_ref(farmer: Uuid) -> ActorRef {
        ActorRef {
            role: ActorRole::Farmer,
            id: farmer,
        }
    }

    fn admin_ref() -> ActorRef {
        ActorRef {
            role: ActorRole::Admin,
            id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn request_freezes_the_booking() {
        let (state, id, farmer, _) = accepted_booking().await;

        let updated = request(
            &state,
            id,
            farmer_ref(farmer),
            "buyer backed out".to_string(),
        )
        .await
        .unwrap();
        assert_eq!(updated.status, BookingStatus::CancellationRequested);

        let result = sequencer::advance(&state, id, StepName::PickupStarted, None, None).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn denial_restores_the_projected_status() {
        let (state, id, farmer, _) = accepted_booking().await;
        request(&state, id, farmer_ref(farmer), "changed my mind".to_string())
            .await
            .unwrap();

        let updated = review(
            &state,
            id,
            admin_ref(),
            ReviewDecision::Denied,
            Some("driver already en route".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(updated.status, BookingStatus::Accepted);
        let record = updated.cancellation.as_ref().unwrap();
        assert_eq!(record.status, CancellationStatus::Denied);
        assert_eq!(record.review_notes.as_deref(), Some("driver already en route"));

        let result = request(&state, id, farmer_ref(farmer), "try again".to_string()).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn approval_is_terminal() {
        let (state, id, farmer, _) = accepted_booking().await;
        request(&state, id, farmer_ref(farmer), "crop spoiled".to_string())
            .await
            .unwrap();

        let updated = review(&state, id, admin_ref(), ReviewDecision::Approved, None)
            .await
            .unwrap();
        assert_eq!(updated.status, BookingStatus::Cancelled);

        let result = sequencer::advance(&state, id, StepName::PickupStarted, None, None).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));

        let result = request(&state, id, farmer_ref(farmer), "again".to_string()).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn pickup_closes_the_cancellation_window() {
        let (state, id, farmer, _) = accepted_booking().await;
        sequencer::advance(&state, id, StepName::PickupStarted, None, None)
            .await
            .unwrap();
        sequencer::advance(&state, id, StepName::OrderPickedUp, None, None)
            .await
            .unwrap();

        let result = request(&state, id, farmer_ref(farmer), "too late now".to_string()).await;

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn review_requires_a_pending_request() {
        let (state, id, _, _) = accepted_booking().await;

        let result = review(&state, id, admin_ref(), ReviewDecision::Approved, None).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn second_review_is_rejected() {
        let (state, id, farmer, _) = accepted_booking().await;
        request(&state, id, farmer_ref(farmer), "rain".to_string())
            .await
            .unwrap();
        review(&state, id, admin_ref(), ReviewDecision::Denied, None)
            .await
            .unwrap();

        let result = review(&state, id, admin_ref(), ReviewDecision::Approved, None).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn blank_reason_is_rejected() {
        let (state, id, farmer, _) = accepted_booking().await;

        let result = request(&state, id, farmer_ref(farmer), "  ".to_string()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let booking = state.ledger.snapshot(id).unwrap();
        assert!(booking.cancellation.is_none());
    }
}
