pub mod codes;
pub mod create;
pub mod pricing;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::Booking;
use crate::models::cancellation::ActorRole;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("booking disappeared between snapshot and commit")]
    Missing,
    #[error("version conflict: ledger at {actual}, snapshot taken at {expected}")]
    Stale { expected: u64, actual: u64 },
}

pub struct BookingLedger {
    bookings: DashMap<Uuid, Booking>,
    by_code: DashMap<String, Uuid>,
    by_token: DashMap<String, Uuid>,
    max_commit_retries: u32,
}

impl BookingLedger {
    pub fn new(max_commit_retries: u32) -> Self {
        Self {
            bookings: DashMap::new(),
            by_code: DashMap::new(),
            by_token: DashMap::new(),
            max_commit_retries,
        }
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    pub fn insert(&self, booking: Booking) -> Result<(), AppError> {
        match self.by_code.entry(booking.code.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::Internal(format!(
                    "booking code collision: {}",
                    booking.code
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(booking.id);
            }
        }
        self.by_token.insert(booking.tracking_token.clone(), booking.id);
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    pub fn snapshot(&self, id: Uuid) -> Result<Booking, AppError> {
        self.bookings
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))
    }

    pub fn resolve_code(&self, code: &str) -> Result<Uuid, AppError> {
        self.by_code
            .get(code)
            .map(|entry| *entry.value())
            .ok_or_else(|| AppError::NotFound(format!("booking {code} not found")))
    }

    pub fn get_by_code(&self, code: &str) -> Result<Booking, AppError> {
        let id = self.resolve_code(code)?;
        self.snapshot(id)
    }

    pub fn get_by_token(&self, token: &str) -> Result<Booking, AppError> {
        let id = self
            .by_token
            .get(token)
            .map(|entry| *entry.value())
            .ok_or_else(|| AppError::NotFound("tracking token not recognized".to_string()))?;
        self.snapshot(id)
    }

    pub fn commit(&self, mut updated: Booking) -> Result<Booking, CommitError> {
        let mut entry = self.bookings.get_mut(&updated.id).ok_or(CommitError::Missing)?;
        if entry.version != updated.version {
            return Err(CommitError::Stale {
                expected: updated.version,
                actual: entry.version,
            });
        }
        updated.version += 1;
        updated.updated_at = Utc::now();
        *entry = updated.clone();
        Ok(updated)
    }

    pub fn update_with<F>(&self, id: Uuid, apply: F) -> Result<Booking, AppError>
    where
        F: Fn(&mut Booking) -> Result<(), AppError>,
    {
        let mut attempts = 0;
        loop {
            let mut snapshot = self.snapshot(id)?;
            apply(&mut snapshot)?;
            match self.commit(snapshot) {
                Ok(committed) => return Ok(committed),
                Err(CommitError::Missing) => {
                    return Err(AppError::NotFound(format!("booking {id} not found")));
                }
                Err(CommitError::Stale { expected, actual }) => {
                    attempts += 1;
                    if attempts > self.max_commit_retries {
                        return Err(AppError::Conflict(format!(
                            "booking {id} kept changing concurrently, gave up after {attempts} attempts"
                        )));
                    }
                    debug!(
                        booking_id = %id,
                        expected,
                        actual,
                        attempt = attempts,
                        "stale snapshot, retrying commit"
                    );
                }
            }
        }
    }

    pub fn list_for(&self, role: ActorRole, actor_id: Option<Uuid>) -> Vec<Booking> {
        let mut rows: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|entry| match role {
                ActorRole::Admin => true,
                ActorRole::Farmer => actor_id.is_some_and(|id| entry.value().farmer_id == id),
                ActorRole::Driver => actor_id.is_some_and(|id| entry.value().driver_id == Some(id)),
            })
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.bookings.iter().map(|entry| *entry.key()).collect()
    }

    pub fn remove_by_code(&self, code: &str) -> Option<Booking> {
        let (_, id) = self.by_code.remove(code)?;
        let (_, booking) = self.bookings.remove(&id)?;
        self.by_token.remove(&booking.tracking_token);
        Some(booking)
    }
}
