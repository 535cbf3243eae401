//! Periodic lifecycle sweeps.

pub mod announcement_tasks;
pub mod registration_tasks;

pub use announcement_tasks::{
    advance_announcement_statuses, advance_announcement_statuses_at, StatusSweepReport,
};
pub use registration_tasks::{
    expire_stale_registration_requests, expire_stale_registration_requests_at,
};

use std::time::Duration;

use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::SchedulerConfig;

/// Starts both sweeps on their own timers. Returns no handles when the
/// scheduler is disabled.
pub fn spawn_sweepers(pool: SqlitePool, config: &SchedulerConfig) -> Vec<JoinHandle<()>> {
    if !config.enabled {
        tracing::info!("Lifecycle sweeps disabled");
        return Vec::new();
    }

    let status_pool = pool.clone();
    let status_every = Duration::from_secs(config.announcement_status_interval_secs.max(1));
    let status = tokio::spawn(async move {
        let mut ticker = interval(status_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = advance_announcement_statuses(&status_pool).await {
                tracing::error!("Announcement status sweep failed: {}", e);
            }
        }
    });

    let expiry_every = Duration::from_secs(config.registration_expiry_interval_secs.max(1));
    let expiry = tokio::spawn(async move {
        let mut ticker = interval(expiry_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = expire_stale_registration_requests(&pool).await {
                tracing::error!("Registration expiry sweep failed: {}", e);
            }
        }
    });

    tracing::info!(
        "Lifecycle sweeps scheduled every {}s (statuses) and {}s (expiry)",
        status_every.as_secs(),
        expiry_every.as_secs()
    );
    vec![status, expiry]
}
