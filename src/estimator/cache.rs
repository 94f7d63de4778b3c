use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::models::booking::{Address, VehicleClass};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    origin_district: String,
    origin_state: String,
    dest_district: String,
    dest_state: String,
    vehicle_class: VehicleClass,
}

impl RouteKey {
    pub fn new(origin: &Address, destination: &Address, vehicle_class: VehicleClass) -> Self {
        Self {
            origin_district: normalize(&origin.district),
            origin_state: normalize(&origin.state),
            dest_district: normalize(&destination.district),
            dest_state: normalize(&destination.state),
            vehicle_class,
        }
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

struct CachedEstimate {
    hours: u32,
    expires_at: Instant,
}

pub struct EstimateCache {
    entries: DashMap<RouteKey, CachedEstimate>,
    capacity: usize,
    ttl: Duration,
}

impl EstimateCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
            ttl,
        }
    }

    pub fn get(&self, key: &RouteKey) -> Option<u32> {
        let hours = {
            let hit = self.entries.get(key)?;
            if hit.expires_at <= Instant::now() {
                None
            } else {
                Some(hit.hours)
            }
        };
        if hours.is_none() {
            self.entries.remove(key);
        }
        hours
    }

    pub fn put(&self, key: RouteKey, hours: u32) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.make_room();
        }
        self.entries.insert(
            key,
            CachedEstimate {
                hours,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    fn make_room(&self) {
        let now = Instant::now();
        self.entries.retain(|_, cached| cached.expires_at > now);
        if self.entries.len() >= self.capacity {
            let victim = self.entries.iter().next().map(|entry| entry.key().clone());
            if let Some(victim) = victim {
                self.entries.remove(&victim);
            }
        }
    }

    pub fn invalidate(&self, key: &RouteKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) -> usize {
        let drained = self.entries.len();
        self.entries.clear();
        drained
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
