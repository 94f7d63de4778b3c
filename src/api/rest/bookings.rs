use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::{assignment, cancellation, sequencer};
use crate::error::AppError;
use crate::ledger::create::{create, CreateBookingRequest};
use crate::models::booking::{Booking, BookingStatus, GeoPoint, LocationPing};
use crate::models::cancellation::{ActorRef, ActorRole, ReviewDecision};
use crate::models::tracking::StepName;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/:code", get(get_booking))
        .route("/bookings/:code/assign", post(assign_driver))
        .route("/bookings/:code/accept", post(accept_booking))
        .route("/bookings/:code/reject", post(reject_booking))
        .route("/bookings/:code/advance", post(advance_step))
        .route("/bookings/:code/location", post(record_location))
        .route("/bookings/:code/cancellation", post(request_cancellation))
        .route("/bookings/:code/cancellation/review", post(review_cancellation))
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = create(&state, payload).await?;
    Ok(Json(booking))
}

#[derive(Deserialize)]
struct ListQuery {
    role: ActorRole,
    actor_id: Option<Uuid>,
}

async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    if query.role != ActorRole::Admin && query.actor_id.is_none() {
        return Err(AppError::Validation(
            "actor_id is required for farmer and driver listings".to_string(),
        ));
    }

    Ok(Json(state.ledger.list_for(query.role, query.actor_id)))
}

async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.ledger.get_by_code(&code)?))
}

#[derive(Deserialize)]
struct AssignRequest {
    driver_id: Uuid,
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Booking>, AppError> {
    let id = state.ledger.resolve_code(&code)?;
    let result = assignment::assign(&state, id, payload.driver_id).await;
    state.metrics.record_transition("assign", result.is_ok());
    Ok(Json(result?))
}

#[derive(Deserialize)]
struct AcceptRequest {
    driver_id: Uuid,
}

async fn accept_booking(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(payload): Json<AcceptRequest>,
) -> Result<Json<Booking>, AppError> {
    let id = state.ledger.resolve_code(&code)?;
    let result = assignment::accept(&state, id, payload.driver_id).await;
    state.metrics.record_transition("accept", result.is_ok());
    Ok(Json(result?))
}

#[derive(Deserialize)]
struct RejectRequest {
    driver_id: Uuid,
    #[serde(default)]
    reason: String,
}

async fn reject_booking(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<Booking>, AppError> {
    let id = state.ledger.resolve_code(&code)?;
    let reason = if payload.reason.trim().is_empty() {
        "no reason given".to_string()
    } else {
        payload.reason
    };
    let result = assignment::reject(&state, id, payload.driver_id, reason).await;
    state.metrics.record_transition("reject", result.is_ok());
    Ok(Json(result?))
}

#[derive(Deserialize)]
struct AdvanceRequest {
    step: String,
    location: Option<GeoPoint>,
    notes: Option<String>,
}

async fn advance_step(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(payload): Json<AdvanceRequest>,
) -> Result<Json<Booking>, AppError> {
    let id = state.ledger.resolve_code(&code)?;
    let step = StepName::parse(&payload.step).ok_or_else(|| {
        AppError::InvalidStep(format!("{} is not a tracking step", payload.step))
    })?;

    let result = sequencer::advance(&state, id, step, payload.location, payload.notes).await;
    state.metrics.record_transition("advance", result.is_ok());
    Ok(Json(result?))
}

#[derive(Deserialize)]
struct LocationRequest {
    driver_id: Uuid,
    point: GeoPoint,
}

async fn record_location(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(payload): Json<LocationRequest>,
) -> Result<Json<Booking>, AppError> {
    let id = state.ledger.resolve_code(&code)?;
    let updated = state.ledger.update_with(id, |booking| {
        if booking.driver_id != Some(payload.driver_id) {
            return Err(AppError::Forbidden(format!(
                "driver {} is not assigned to booking {}",
                payload.driver_id, booking.code
            )));
        }
        match booking.status {
            BookingStatus::Accepted | BookingStatus::InProgress => {}
            status => {
                return Err(AppError::InvalidState(format!(
                    "booking {} is not en route ({status})",
                    booking.code
                )));
            }
        }

        booking.last_location = Some(LocationPing {
            point: payload.point.clone(),
            recorded_at: Utc::now(),
        });
        Ok(())
    })?;

    Ok(Json(updated))
}

#[derive(Deserialize)]
struct CancellationBody {
    requested_by: ActorRef,
    #[serde(default)]
    reason: String,
}

async fn request_cancellation(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(payload): Json<CancellationBody>,
) -> Result<Json<Booking>, AppError> {
    let id = state.ledger.resolve_code(&code)?;
    let result = cancellation::request(&state, id, payload.requested_by, payload.reason).await;
    state.metrics.record_transition("cancel_request", result.is_ok());
    Ok(Json(result?))
}

#[derive(Deserialize)]
struct ReviewBody {
    reviewer: ActorRef,
    decision: ReviewDecision,
    notes: Option<String>,
}

async fn review_cancellation(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(payload): Json<ReviewBody>,
) -> Result<Json<Booking>, AppError> {
    let id = state.ledger.resolve_code(&code)?;
    let result = cancellation::review(
        &state,
        id,
        payload.reviewer,
        payload.decision,
        payload.notes,
    )
    .await;
    state.metrics.record_transition("cancel_review", result.is_ok());
    Ok(Json(result?))
}
