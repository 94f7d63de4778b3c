use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus, LocationPing};
use crate::models::tracking::TrackingStep;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/track/:token", get(track))
}

#[derive(Debug, Serialize)]
pub struct TrackingView {
    pub booking_code: String,
    pub status: BookingStatus,
    pub steps: [TrackingStep; 6],
    pub overdue: bool,
    pub expected_delivery: DateTime<Utc>,
    pub rebaselined_delivery: Option<DateTime<Utc>>,
    pub last_location: Option<LocationPing>,
}

impl From<Booking> for TrackingView {
    fn from(booking: Booking) -> Self {
        Self {
            booking_code: booking.code,
            status: booking.status,
            steps: booking.steps,
            overdue: booking.overdue,
            expected_delivery: booking.schedule.expected_delivery,
            rebaselined_delivery: booking.schedule.rebaselined_delivery,
            last_location: booking.last_location,
        }
    }
}

async fn track(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<TrackingView>, AppError> {
    let booking = state.ledger.get_by_token(&token)?;
    Ok(Json(TrackingView::from(booking)))
}
