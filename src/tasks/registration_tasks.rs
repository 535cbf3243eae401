use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{AppError, Result};

pub async fn expire_stale_registration_requests(pool: &SqlitePool) -> Result<u64> {
    expire_stale_registration_requests_at(pool, Utc::now()).await
}

/// Expires every pending request whose announcement stopped taking
/// registrations before `now`. Returns how many were expired.
pub async fn expire_stale_registration_requests_at(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let now = now.naive_utc();

    let expired = sqlx::query(
        r#"
        UPDATE registration_requests
        SET status = 'expired', updated_at = ?
        WHERE status = 'pending'
          AND announcement_id IN (
              SELECT id FROM announcements WHERE registration_end_at < ?
          )
        "#
    )
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
    .rows_affected();

    if expired > 0 {
        tracing::info!("Expired {} registration requests", expired);
    } else {
        tracing::debug!("No registration requests to expire");
    }
    Ok(expired)
}
