use chrono::{DateTime, Utc};
use uuid::Uuid;

pub fn booking_code(at: DateTime<Utc>) -> String {
    let entropy = Uuid::new_v4().simple().to_string();
    format!(
        "AGB-{}-{}",
        at.format("%Y%m%d"),
        entropy[..6].to_uppercase()
    )
}

pub fn tracking_token() -> String {
    format!("trk_{}", Uuid::new_v4().simple())
}
