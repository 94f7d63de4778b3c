use crate::models::booking::{Booking, BookingStatus};
use crate::models::cancellation::CancellationStatus;
use crate::models::tracking::{StepName, StepStatus};

pub fn project_status(booking: &Booking) -> BookingStatus {
    if let Some(cancellation) = &booking.cancellation {
        match cancellation.status {
            CancellationStatus::Pending => return BookingStatus::CancellationRequested,
            CancellationStatus::Approved => return BookingStatus::Cancelled,
            CancellationStatus::Denied => {}
        }
    }

    let furthest = booking
        .steps
        .iter()
        .rev()
        .find(|step| step.status == StepStatus::Completed)
        .map(|step| step.name);

    match furthest {
        Some(StepName::Delivered) => BookingStatus::Completed,
        Some(StepName::InTransit | StepName::OrderPickedUp | StepName::PickupStarted) => {
            BookingStatus::InProgress
        }
        Some(StepName::OrderAccepted) => BookingStatus::Accepted,
        Some(StepName::OrderPlaced) | None => {
            if booking.driver_id.is_some() {
                BookingStatus::Confirmed
            } else {
                BookingStatus::Pending
            }
        }
    }
}

pub fn reproject(booking: &mut Booking) {
    booking.status = project_status(booking);
}
