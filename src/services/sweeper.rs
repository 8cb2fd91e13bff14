//! Background reclamation of screenings that ended long ago.
//!
//! A screening and all of its orders and order seats are hard-deleted once
//! `now - end_time` exceeds the retention window. There is no audit trail.
//! A booking can still land on a screening in the instant before the sweep
//! removes it; such a screening is hours in the past, so the window is
//! accepted.

use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{SweeperConfig, MIN_SWEEP_INTERVAL_SECONDS};
use crate::error::BookingResult;
use crate::store::{BookingStore, SweepReport};

pub struct ExpirationSweeper {
    store: Arc<dyn BookingStore>,
    interval: Duration,
    retention: chrono::Duration,
}

impl ExpirationSweeper {
    pub fn new(store: Arc<dyn BookingStore>, interval: Duration, retention: chrono::Duration) -> Self {
        let interval = interval.max(Duration::from_secs(MIN_SWEEP_INTERVAL_SECONDS));
        Self { store, interval, retention }
    }

    pub fn from_config(store: Arc<dyn BookingStore>, cfg: &SweeperConfig) -> Self {
        Self::new(store, cfg.interval(), cfg.retention())
    }

    pub fn cutoff(&self, now: NaiveDateTime) -> NaiveDateTime {
        now.checked_sub_signed(self.retention).unwrap_or(NaiveDateTime::MIN)
    }

    /// One pass: every screening that ended before `now - retention` goes.
    pub async fn sweep_once(&self, now: NaiveDateTime) -> BookingResult<SweepReport> {
        let cutoff = self.cutoff(now);
        let report = self.store.purge_screenings_ended_before(cutoff).await?;

        info!(
            "🧹 sweep done (cutoff {}): {} screenings, {} orders, {} order seats removed",
            cutoff, report.screenings_deleted, report.orders_deleted, report.order_seats_deleted
        );
        if report.failed > 0 {
            warn!("🧹 {} expired screenings could not be removed, will retry", report.failed);
        }
        Ok(report)
    }

    /// Sweeps immediately, then once per interval, forever. Errors are logged
    /// and never end the loop.
    pub async fn run(self) {
        info!(
            "Expiration sweeper started: every {:?}, retention {}h",
            self.interval,
            self.retention.num_hours()
        );
        loop {
            if let Err(e) = self.sweep_once(Utc::now().naive_utc()).await {
                error!("🧹 sweep failed: {}", e);
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Detached background task; the handle is never awaited by the server.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
