use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::booking::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    OrderPlaced,
    OrderAccepted,
    PickupStarted,
    OrderPickedUp,
    InTransit,
    Delivered,
}

impl StepName {
    pub const ALL: [StepName; 6] = [
        StepName::OrderPlaced,
        StepName::OrderAccepted,
        StepName::PickupStarted,
        StepName::OrderPickedUp,
        StepName::InTransit,
        StepName::Delivered,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn predecessor(self) -> Option<StepName> {
        match self.index() {
            0 => None,
            idx => Some(Self::ALL[idx - 1]),
        }
    }

    pub fn successor(self) -> Option<StepName> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn parse(raw: &str) -> Option<StepName> {
        match raw {
            "order_placed" => Some(StepName::OrderPlaced),
            "order_accepted" => Some(StepName::OrderAccepted),
            "pickup_started" => Some(StepName::PickupStarted),
            "order_picked_up" => Some(StepName::OrderPickedUp),
            "in_transit" => Some(StepName::InTransit),
            "delivered" => Some(StepName::Delivered),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepName::OrderPlaced => "order_placed",
            StepName::OrderAccepted => "order_accepted",
            StepName::PickupStarted => "pickup_started",
            StepName::OrderPickedUp => "order_picked_up",
            StepName::InTransit => "in_transit",
            StepName::Delivered => "delivered",
        }
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Current,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingStep {
    pub name: StepName,
    pub status: StepStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub location: Option<GeoPoint>,
    pub notes: Option<String>,
}

impl TrackingStep {
    pub fn pending(name: StepName) -> Self {
        Self {
            name,
            status: StepStatus::Pending,
            completed_at: None,
            location: None,
            notes: None,
        }
    }
}

pub fn initial_steps(placed_at: DateTime<Utc>) -> [TrackingStep; 6] {
    let mut steps = StepName::ALL.map(TrackingStep::pending);
    let placed = &mut steps[StepName::OrderPlaced.index()];
    placed.status = StepStatus::Completed;
    placed.completed_at = Some(placed_at);
    steps
}
