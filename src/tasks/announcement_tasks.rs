use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    domain::AnnouncementStatus,
    error::{AppError, Result},
};

/// Rows moved by one status sweep, per transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSweepReport {
    pub opened: u64,
    pub closed: u64,
    pub started: u64,
}

impl StatusSweepReport {
    pub fn total(&self) -> u64 {
        self.opened + self.closed + self.started
    }
}

/// `(from, to, column that must have passed)`, applied in this order.
const TRANSITIONS: [(AnnouncementStatus, AnnouncementStatus, &str); 3] = [
    (
        AnnouncementStatus::PreRegistration,
        AnnouncementStatus::RegistrationOpen,
        "registration_start_at",
    ),
    (
        AnnouncementStatus::RegistrationOpen,
        AnnouncementStatus::RegistrationClosed,
        "registration_end_at",
    ),
    (
        AnnouncementStatus::RegistrationClosed,
        AnnouncementStatus::Live,
        "start_at",
    ),
];

pub async fn advance_announcement_statuses(pool: &SqlitePool) -> Result<StatusSweepReport> {
    advance_announcement_statuses_at(pool, Utc::now()).await
}

/// Moves announcements forward along the time-driven part of the lifecycle.
///
/// Each update only matches rows in its source status, so terminal and
/// manually set statuses are never touched. The updates run in lifecycle
/// order inside one transaction, which leaves nothing for an immediate
/// second run to do.
pub async fn advance_announcement_statuses_at(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<StatusSweepReport> {
    let now = now.naive_utc();
    let mut counts = [0u64; 3];
    let mut tx = pool.begin().await?;

    for (count, (from, to, column)) in counts.iter_mut().zip(TRANSITIONS) {
        *count = sqlx::query(&format!(
            "UPDATE announcements SET status = ?, updated_at = ? WHERE status = ? AND {column} <= ?"
        ))
        .bind(to.as_str())
        .bind(now)
        .bind(from.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .rows_affected();
    }

    tx.commit().await?;

    let report = StatusSweepReport {
        opened: counts[0],
        closed: counts[1],
        started: counts[2],
    };
    if report.total() > 0 {
        tracing::info!(
            "Announcement status sweep: {} opened, {} closed, {} live",
            report.opened,
            report.closed,
            report.started
        );
    } else {
        tracing::debug!("No announcement statuses to advance");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_follow_lifecycle_order() {
        let mut previous = TRANSITIONS[0].0;
        for (from, to, _) in TRANSITIONS {
            assert_eq!(from, previous);
            assert!(!from.is_terminal());
            previous = to;
        }
        assert_eq!(previous, AnnouncementStatus::Live);
    }

    #[test]
    fn test_report_total() {
        let report = StatusSweepReport {
            opened: 2,
            closed: 1,
            started: 0,
        };
        assert_eq!(report.total(), 3);
        assert_eq!(StatusSweepReport::default().total(), 0);
    }
}
