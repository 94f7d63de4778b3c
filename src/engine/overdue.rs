use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::booking::Booking;
use crate::notify::Notification;
use crate::state::AppState;

pub const REMEDIATION_WINDOW_HOURS: i64 = 48;

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub flagged: usize,
    pub failed: usize,
}

pub fn sweep(state: &AppState, now: DateTime<Utc>) -> SweepReport {
    let started = std::time::Instant::now();
    let mut report = SweepReport::default();

    for id in state.ledger.ids() {
        report.scanned += 1;

        match state.ledger.snapshot(id) {
            Ok(booking) if is_due(&booking, now) => {}
            _ => continue,
        }

        let flagged = AtomicBool::new(false);
        let result = state.ledger.update_with(id, |booking| {
            flagged.store(false, Ordering::Relaxed);
            if !is_due(booking, now) {
                return Ok(());
            }
            let rebaseline = now
                .checked_add_signed(chrono::Duration::hours(REMEDIATION_WINDOW_HOURS))
                .ok_or_else(|| {
                    AppError::Internal("rebaselined delivery does not fit the calendar".to_string())
                })?;
            booking.overdue = true;
            booking.schedule.rebaselined_delivery = Some(rebaseline);
            flagged.store(true, Ordering::Relaxed);
            Ok(())
        });

        match result {
            Ok(updated) if flagged.load(Ordering::Relaxed) => {
                report.flagged += 1;
                if let Some(rebaselined) = updated.schedule.rebaselined_delivery {
                    state.notifier.publish(Notification::transport(
                        updated.farmer_id,
                        "Delivery delayed",
                        format!(
                            "We are sorry, booking {} is running late. New expected delivery: {}.",
                            updated.code,
                            rebaselined.format("%Y-%m-%d %H:%M UTC")
                        ),
                    ));
                    info!(
                        booking_code = %updated.code,
                        expected = %updated.schedule.expected_delivery,
                        rebaselined = %rebaselined,
                        "booking flagged overdue"
                    );
                }
            }
            Ok(_) => {}
            Err(err) => {
                report.failed += 1;
                warn!(booking_id = %id, error = %err, "sweep skipped a booking");
            }
        }
    }

    state
        .metrics
        .overdue_flagged_total
        .inc_by(report.flagged as u64);
    state
        .metrics
        .sweep_duration_seconds
        .observe(started.elapsed().as_secs_f64());

    report
}

fn is_due(booking: &Booking, now: DateTime<Utc>) -> bool {
    !booking.overdue && !booking.status.is_terminal() && booking.schedule.expected_delivery < now
}

pub async fn run_overdue_monitor(state: Arc<AppState>, period: Duration) {
    info!(period_secs = period.as_secs(), "overdue monitor started");

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let report = sweep(&state, Utc::now());
        if report.flagged > 0 || report.failed > 0 {
            info!(
                scanned = report.scanned,
                flagged = report.flagged,
                failed = report.failed,
                "overdue sweep finished"
            );
        } else {
            debug!(scanned = report.scanned, "overdue sweep finished");
        }
    }
}
