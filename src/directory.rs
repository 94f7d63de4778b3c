use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;

#[async_trait]
pub trait PartyDirectory: Send + Sync {
    async fn validate_driver(&self, driver_id: Uuid) -> Result<(), AppError>;
    async fn validate_vehicle(&self, vehicle_id: &str) -> Result<(), AppError>;
}

pub struct PermissiveDirectory;

#[async_trait]
impl PartyDirectory for PermissiveDirectory {
    async fn validate_driver(&self, _driver_id: Uuid) -> Result<(), AppError> {
        Ok(())
    }

    async fn validate_vehicle(&self, vehicle_id: &str) -> Result<(), AppError> {
        if vehicle_id.trim().is_empty() {
            return Err(AppError::Validation("vehicle id cannot be empty".to_string()));
        }
        Ok(())
    }
}

pub struct StaticDirectory {
    drivers: HashSet<Uuid>,
    vehicles: HashSet<String>,
}

impl StaticDirectory {
    pub fn new(drivers: impl IntoIterator<Item = Uuid>, vehicles: impl IntoIterator<Item = String>) -> Self {
        Self {
            drivers: drivers.into_iter().collect(),
            vehicles: vehicles.into_iter().collect(),
        }
    }
}

#[async_trait]
impl PartyDirectory for StaticDirectory {
    async fn validate_driver(&self, driver_id: Uuid) -> Result<(), AppError> {
        if self.drivers.contains(&driver_id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("driver {driver_id} not found")))
        }
    }

    async fn validate_vehicle(&self, vehicle_id: &str) -> Result<(), AppError> {
        if self.vehicles.contains(vehicle_id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("vehicle {vehicle_id} not found")))
        }
    }
}
