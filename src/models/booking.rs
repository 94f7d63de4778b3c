use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::cancellation::CancellationRequest;
use crate::models::tracking::{StepName, StepStatus, TrackingStep};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Accepted,
    InProgress,
    CancellationRequested,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Accepted => "accepted",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::CancellationRequested => "cancellation_requested",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    MiniTruck,
    Truck,
    Lorry,
    Tractor,
}

impl VehicleClass {
    pub fn journey_factor(self) -> f64 {
        match self {
            VehicleClass::MiniTruck => 0.9,
            VehicleClass::Truck => 1.0,
            VehicleClass::Lorry => 1.2,
            VehicleClass::Tractor => 1.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub line: String,
    pub district: String,
    pub state: String,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fare {
    pub distance_km: f64,
    pub base_amount: f64,
    pub distance_charge: f64,
    pub handling_fee: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub pickup_at: DateTime<Utc>,
    pub expected_delivery: DateTime<Utc>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub rebaselined_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationPing {
    pub point: GeoPoint,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub code: String,
    pub tracking_token: String,
    pub farmer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: String,
    pub vehicle_class: VehicleClass,
    pub origin: Address,
    pub destination: Address,
    pub cargo: String,
    pub notes: Option<String>,
    pub fare: Fare,
    pub schedule: Schedule,
    pub status: BookingStatus,
    pub steps: [TrackingStep; 6],
    pub cancellation: Option<CancellationRequest>,
    pub overdue: bool,
    pub last_location: Option<LocationPing>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn step(&self, name: StepName) -> &TrackingStep {
        &self.steps[name.index()]
    }

    pub fn step_mut(&mut self, name: StepName) -> &mut TrackingStep {
        &mut self.steps[name.index()]
    }

    pub fn step_completed(&self, name: StepName) -> bool {
        self.step(name).status == StepStatus::Completed
    }
}
