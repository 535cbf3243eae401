use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Announcement, AnnouncementParticipant, AnnouncementStatus, CreateFormFieldRequest},
    error::{AppError, Result},
    repository::{parse_uuid, registration_repository::insert_form, to_utc, AnnouncementRepository},
    search::fold_case,
};

#[derive(FromRow)]
pub struct AnnouncementRow {
    id: String,
    game_id: String,
    organizer_id: String,
    title: String,
    content: Option<String>,
    image_url: Option<String>,
    start_at: NaiveDateTime,
    registration_start_at: NaiveDateTime,
    registration_end_at: NaiveDateTime,
    end_at: Option<NaiveDateTime>,
    max_participants: i32,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Column list for queries that alias `announcements` as `a`.
pub(crate) const ANNOUNCEMENT_COLUMNS: &str = "a.id, a.game_id, a.organizer_id, a.title, a.content, \
a.image_url, a.start_at, a.registration_start_at, a.registration_end_at, a.end_at, \
a.max_participants, a.status, a.created_at, a.updated_at";

#[derive(FromRow)]
struct ParticipantRow {
    announcement_id: String,
    user_id: String,
    email: String,
    nickname: Option<String>,
    joined_at: NaiveDateTime,
}

pub struct SqliteAnnouncementRepository {
    pool: SqlitePool,
}

impl SqliteAnnouncementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn row_to_announcement(row: AnnouncementRow) -> Result<Announcement> {
        Ok(Announcement {
            id: parse_uuid(&row.id)?,
            game_id: parse_uuid(&row.game_id)?,
            organizer_id: parse_uuid(&row.organizer_id)?,
            title: row.title,
            content: row.content,
            image_url: row.image_url,
            start_at: to_utc(row.start_at),
            registration_start_at: to_utc(row.registration_start_at),
            registration_end_at: to_utc(row.registration_end_at),
            end_at: row.end_at.map(to_utc),
            max_participants: row.max_participants,
            status: AnnouncementStatus::from_str(&row.status).ok_or_else(|| {
                AppError::Database(format!("Invalid announcement status: {}", row.status))
            })?,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }

    async fn list_where(
        &self,
        condition: &str,
        bind: String,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Announcement>, i64)> {
        let rows = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements a WHERE {condition} \
             ORDER BY a.start_at DESC, a.id LIMIT ? OFFSET ?"
        ))
        .bind(&bind)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM announcements a WHERE {condition}"
        ))
        .bind(&bind)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let announcements = rows
            .into_iter()
            .map(Self::row_to_announcement)
            .collect::<Result<Vec<_>>>()?;
        Ok((announcements, count))
    }
}

#[async_trait]
impl AnnouncementRepository for SqliteAnnouncementRepository {
    async fn create(
        &self,
        announcement: Announcement,
        form: Option<Vec<CreateFormFieldRequest>>,
    ) -> Result<Announcement> {
        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO announcements (
                id, game_id, organizer_id, title, content, title_search, content_search,
                image_url, start_at, registration_start_at, registration_end_at, end_at,
                max_participants, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(announcement.id.to_string())
        .bind(announcement.game_id.to_string())
        .bind(announcement.organizer_id.to_string())
        .bind(&announcement.title)
        .bind(&announcement.content)
        .bind(fold_case(&announcement.title))
        .bind(announcement.content.as_deref().map(fold_case))
        .bind(&announcement.image_url)
        .bind(announcement.start_at.naive_utc())
        .bind(announcement.registration_start_at.naive_utc())
        .bind(announcement.registration_end_at.naive_utc())
        .bind(announcement.end_at.map(|dt| dt.naive_utc()))
        .bind(announcement.max_participants)
        .bind(announcement.status.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(fields) = form {
            insert_form(&mut *tx, announcement.id, &fields).await?;
        }

        tx.commit().await?;

        self.find_by_id(announcement.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created announcement".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Announcement>> {
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements a WHERE a.id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_announcement).transpose()
    }

    async fn update(&self, announcement: &Announcement) -> Result<Announcement> {
        let result = sqlx::query(
            r#"
            UPDATE announcements
            SET title = ?, content = ?, title_search = ?, content_search = ?, image_url = ?,
                start_at = ?, registration_start_at = ?, registration_end_at = ?,
                max_participants = ?, updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(&announcement.title)
        .bind(&announcement.content)
        .bind(fold_case(&announcement.title))
        .bind(announcement.content.as_deref().map(fold_case))
        .bind(&announcement.image_url)
        .bind(announcement.start_at.naive_utc())
        .bind(announcement.registration_start_at.naive_utc())
        .bind(announcement.registration_end_at.naive_utc())
        .bind(announcement.max_participants)
        .bind(Utc::now().naive_utc())
        .bind(announcement.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Announcement not found".to_string()));
        }

        self.find_by_id(announcement.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated announcement".to_string())
        })
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: AnnouncementStatus,
        to: AnnouncementStatus,
        end_at: Option<DateTime<Utc>>,
    ) -> Result<Announcement> {
        let result = sqlx::query(
            r#"
            UPDATE announcements
            SET status = ?, end_at = COALESCE(?, end_at), updated_at = ?
            WHERE id = ? AND status = ?
            "#
        )
        .bind(to.as_str())
        .bind(end_at.map(|dt| dt.naive_utc()))
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Announcement not found".to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::Validation(format!(
                "Cannot change announcement from '{}' to '{}': it is now '{}'",
                from.as_str(),
                to.as_str(),
                current.status.as_str()
            )));
        }
        Ok(current)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM announcements WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list_by_organizer(&self, organizer_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<Announcement>, i64)> {
        self.list_where("a.organizer_id = ?", organizer_id.to_string(), limit, offset)
            .await
    }

    async fn list_by_participant(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<Announcement>, i64)> {
        self.list_where(
            "a.id IN (SELECT announcement_id FROM announcement_participants WHERE user_id = ?)",
            user_id.to_string(),
            limit,
            offset,
        )
        .await
    }

    async fn list_participants(
        &self,
        announcement_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AnnouncementParticipant>, i64)> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT p.announcement_id, p.user_id, u.email, u.nickname, p.joined_at
            FROM announcement_participants p
            JOIN users u ON u.id = p.user_id
            WHERE p.announcement_id = ?
            ORDER BY p.joined_at ASC, p.id
            LIMIT ? OFFSET ?
            "#
        )
        .bind(announcement_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM announcement_participants WHERE announcement_id = ?",
        )
        .bind(announcement_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let participants = rows
            .into_iter()
            .map(|row| {
                Ok(AnnouncementParticipant {
                    announcement_id: parse_uuid(&row.announcement_id)?,
                    user_id: parse_uuid(&row.user_id)?,
                    email: row.email,
                    nickname: row.nickname,
                    joined_at: to_utc(row.joined_at),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((participants, count))
    }

    async fn is_participant(&self, announcement_id: Uuid, user_id: Uuid) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM announcement_participants WHERE announcement_id = ? AND user_id = ?",
        )
        .bind(announcement_id.to_string())
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }
}
