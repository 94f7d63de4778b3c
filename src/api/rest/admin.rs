use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::overdue::{sweep, SweepReport};
use crate::error::AppError;
use crate::models::booking::{Address, Booking, BookingStatus, VehicleClass};
use crate::models::cancellation::ActorRole;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(list_all).delete(purge_bookings))
        .route("/bookings/:code/status", patch(force_status))
        .route("/sweep", post(run_sweep))
        .route("/estimate-cache", delete(clear_estimate_cache))
        .route("/estimate-cache/route", delete(invalidate_estimate_route))
}

async fn list_all(State(state): State<Arc<AppState>>) -> Json<Vec<Booking>> {
    Json(state.ledger.list_for(ActorRole::Admin, None))
}

#[derive(Deserialize)]
struct ForceStatusRequest {
    status: BookingStatus,
    note: Option<String>,
}

async fn force_status(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(payload): Json<ForceStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let id = state.ledger.resolve_code(&code)?;
    let result = state.ledger.update_with(id, |booking| {
        booking.status = payload.status;
        Ok(())
    });
    state.metrics.record_transition("admin_override", result.is_ok());
    let updated = result?;

    warn!(
        booking_code = %updated.code,
        status = %updated.status,
        note = payload.note.as_deref().unwrap_or(""),
        "booking status forced"
    );

    Ok(Json(updated))
}

#[derive(Deserialize)]
struct PurgeRequest {
    codes: Vec<String>,
}

#[derive(Serialize)]
struct PurgeResponse {
    deleted: usize,
}

async fn purge_bookings(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PurgeRequest>,
) -> Json<PurgeResponse> {
    let mut deleted = 0;
    for code in &payload.codes {
        if state.ledger.remove_by_code(code).is_some() {
            deleted += 1;
            warn!(booking_code = %code, "booking purged");
        }
    }
    Json(PurgeResponse { deleted })
}

async fn run_sweep(State(state): State<Arc<AppState>>) -> Json<SweepReport> {
    Json(sweep(&state, Utc::now()))
}

#[derive(Serialize)]
struct CacheClearResponse {
    cleared: usize,
}

async fn clear_estimate_cache(State(state): State<Arc<AppState>>) -> Json<CacheClearResponse> {
    Json(CacheClearResponse {
        cleared: state.estimator.invalidate_cache(),
    })
}

#[derive(Deserialize)]
struct RouteQuery {
    origin_district: String,
    origin_state: String,
    destination_district: String,
    destination_state: String,
    vehicle_class: VehicleClass,
}

async fn invalidate_estimate_route(
    State(state): State<Arc<AppState>>,
    Query(route): Query<RouteQuery>,
) -> Json<CacheClearResponse> {
    let origin = Address {
        line: String::new(),
        district: route.origin_district,
        state: route.origin_state,
        postal_code: None,
    };
    let destination = Address {
        line: String::new(),
        district: route.destination_district,
        state: route.destination_state,
        postal_code: None,
    };
    let cleared = state
        .estimator
        .invalidate_route(&origin, &destination, route.vehicle_class);
    Json(CacheClearResponse {
        cleared: usize::from(cleared),
    })
}
