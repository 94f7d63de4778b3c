use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::engine::status;
use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus, GeoPoint, LocationPing};
use crate::models::tracking::{StepName, StepStatus};
use crate::notify::Notification;
use crate::state::AppState;

pub(crate) fn complete_step(
    booking: &mut Booking,
    name: StepName,
    at: DateTime<Utc>,
    location: Option<GeoPoint>,
    notes: Option<String>,
) -> Result<(), AppError> {
    if booking.step_completed(name) {
        return Err(AppError::InvalidTransition(format!(
            "step {name} is already completed"
        )));
    }
    if let Some(previous) = name.predecessor() {
        if !booking.step_completed(previous) {
            return Err(AppError::InvalidTransition(format!(
                "step {name} cannot complete before {previous}"
            )));
        }
    }

    let step = booking.step_mut(name);
    step.status = StepStatus::Completed;
    step.completed_at = Some(at);
    step.location = location.clone();
    step.notes = notes;

    if let Some(next) = name.successor() {
        booking.step_mut(next).status = StepStatus::Current;
    }

    if let Some(point) = location {
        booking.last_location = Some(LocationPing {
            point,
            recorded_at: at,
        });
    }

    Ok(())
}

pub async fn advance(
    state: &AppState,
    booking_id: Uuid,
    step: StepName,
    location: Option<GeoPoint>,
    notes: Option<String>,
) -> Result<Booking, AppError> {
    if step == StepName::OrderAccepted {
        return Err(AppError::InvalidState(
            "order_accepted is recorded through driver acceptance".to_string(),
        ));
    }

    let updated = state.ledger.update_with(booking_id, |booking| {
        if booking.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "booking {} is already {}",
                booking.code, booking.status
            )));
        }
        if booking.status == BookingStatus::CancellationRequested {
            return Err(AppError::InvalidState(format!(
                "booking {} has a cancellation request under review",
                booking.code
            )));
        }

        let now = Utc::now();
        complete_step(booking, step, now, location.clone(), notes.clone())?;
        if step == StepName::Delivered {
            booking.schedule.actual_delivery = Some(now);
        }
        status::reproject(booking);
        Ok(())
    })?;

    state.notifier.publish(Notification::transport(
        updated.farmer_id,
        "Tracking update",
        format!("Booking {} reached {}.", updated.code, step),
    ));

    info!(
        booking_code = %updated.code,
        step = %step,
        status = %updated.status,
        "tracking step completed"
    );

    Ok(updated)
}
