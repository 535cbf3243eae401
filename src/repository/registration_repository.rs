use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        CreateFormFieldRequest, FormField, FormFieldAnswer, FormFieldType, NewRegistrationRequest,
        RegistrationForm, RegistrationRequest, RegistrationStatus,
    },
    error::{AppError, Result},
    repository::{parse_uuid, to_utc, RegistrationRepository},
};

#[derive(FromRow)]
struct FormRow {
    id: String,
    announcement_id: String,
    created_at: NaiveDateTime,
}

#[derive(FromRow)]
struct FormFieldRow {
    id: String,
    form_id: String,
    field_type: String,
    label: String,
    required: i32,
    options: Option<String>,
    position: i32,
}

#[derive(FromRow)]
struct RequestRow {
    id: String,
    announcement_id: String,
    user_id: String,
    organizer_id: String,
    status: String,
    cancellation_reason: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct AnswerRow {
    id: String,
    form_field_id: String,
    label: String,
    value: String,
}

const REQUEST_SELECT: &str = r#"
    SELECT r.id, r.announcement_id, r.user_id, a.organizer_id, r.status,
           r.cancellation_reason, r.created_at, r.updated_at
    FROM registration_requests r
    JOIN announcements a ON a.id = r.announcement_id
"#;

pub struct SqliteRegistrationRepository {
    pool: SqlitePool,
}

impl SqliteRegistrationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn list_where(
        &self,
        condition: &str,
        bind: String,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RegistrationRequest>, i64)> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "{REQUEST_SELECT} WHERE {condition} ORDER BY r.created_at DESC, r.id LIMIT ? OFFSET ?"
        ))
        .bind(&bind)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM registration_requests r WHERE {condition}"
        ))
        .bind(&bind)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in rows {
            requests.push(row_to_request(&mut conn, row).await?);
        }
        Ok((requests, count))
    }
}

fn row_to_field(row: FormFieldRow) -> Result<FormField> {
    let options = row
        .options
        .map(|raw| serde_json::from_str::<Vec<String>>(&raw))
        .transpose()
        .map_err(|e| AppError::Database(format!("Invalid form field options: {}", e)))?;

    Ok(FormField {
        id: parse_uuid(&row.id)?,
        form_id: parse_uuid(&row.form_id)?,
        field_type: FormFieldType::from_str(&row.field_type).ok_or_else(|| {
            AppError::Database(format!("Invalid form field type: {}", row.field_type))
        })?,
        label: row.label,
        required: row.required != 0,
        options,
        position: row.position,
    })
}

async fn row_to_request(conn: &mut SqliteConnection, row: RequestRow) -> Result<RegistrationRequest> {
    let answers = sqlx::query_as::<_, AnswerRow>(
        r#"
        SELECT resp.id, resp.form_field_id, f.label, resp.value
        FROM form_field_responses resp
        JOIN form_fields f ON f.id = resp.form_field_id
        WHERE resp.registration_request_id = ?
        ORDER BY f.position ASC
        "#
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::Database(e.to_string()))?;

    let form_responses = answers
        .into_iter()
        .map(|a| {
            Ok(FormFieldAnswer {
                id: parse_uuid(&a.id)?,
                form_field_id: parse_uuid(&a.form_field_id)?,
                label: a.label,
                value: a.value,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RegistrationRequest {
        id: parse_uuid(&row.id)?,
        announcement_id: parse_uuid(&row.announcement_id)?,
        user_id: parse_uuid(&row.user_id)?,
        organizer_id: parse_uuid(&row.organizer_id)?,
        status: RegistrationStatus::from_str(&row.status).ok_or_else(|| {
            AppError::Database(format!("Invalid registration status: {}", row.status))
        })?,
        cancellation_reason: row.cancellation_reason,
        form_responses,
        created_at: to_utc(row.created_at),
        updated_at: to_utc(row.updated_at),
    })
}

async fn load_request(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<RegistrationRequest>> {
    let row = sqlx::query_as::<_, RequestRow>(&format!("{REQUEST_SELECT} WHERE r.id = ?"))
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    match row {
        Some(row) => Ok(Some(row_to_request(conn, row).await?)),
        None => Ok(None),
    }
}

async fn load_form(conn: &mut SqliteConnection, announcement_id: Uuid) -> Result<Option<RegistrationForm>> {
    let form = sqlx::query_as::<_, FormRow>(
        "SELECT id, announcement_id, created_at FROM registration_forms WHERE announcement_id = ?",
    )
    .bind(announcement_id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::Database(e.to_string()))?;

    let Some(form) = form else {
        return Ok(None);
    };

    let fields = sqlx::query_as::<_, FormFieldRow>(
        r#"
        SELECT id, form_id, field_type, label, required, options, position
        FROM form_fields
        WHERE form_id = ?
        ORDER BY position ASC
        "#
    )
    .bind(&form.id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Some(RegistrationForm {
        id: parse_uuid(&form.id)?,
        announcement_id: parse_uuid(&form.announcement_id)?,
        fields: fields.into_iter().map(row_to_field).collect::<Result<Vec<_>>>()?,
        created_at: to_utc(form.created_at),
    }))
}

/// Inserts a form and its fields, numbering fields in the order given.
pub(crate) async fn insert_form(
    conn: &mut SqliteConnection,
    announcement_id: Uuid,
    fields: &[CreateFormFieldRequest],
) -> Result<RegistrationForm> {
    let form_id = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO registration_forms (id, announcement_id, created_at) VALUES (?, ?, ?)")
        .bind(&form_id)
        .bind(announcement_id.to_string())
        .bind(Utc::now().naive_utc())
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    for (position, field) in fields.iter().enumerate() {
        let options = field
            .options
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO form_fields (id, form_id, field_type, label, required, options, position)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&form_id)
        .bind(field.field_type.as_str())
        .bind(&field.label)
        .bind(field.required as i32)
        .bind(options)
        .bind(position as i32)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    }

    load_form(conn, announcement_id)
        .await?
        .ok_or_else(|| AppError::Database("Failed to retrieve created form".to_string()))
}

fn status_list(statuses: &[RegistrationStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl RegistrationRepository for SqliteRegistrationRepository {
    async fn find_form(&self, announcement_id: Uuid) -> Result<Option<RegistrationForm>> {
        let mut conn = self.pool.acquire().await?;
        load_form(&mut conn, announcement_id).await
    }

    async fn replace_form(
        &self,
        announcement_id: Uuid,
        fields: &[CreateFormFieldRequest],
        cancellation_reason: &str,
    ) -> Result<(RegistrationForm, u64)> {
        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        let cancelled = sqlx::query(&format!(
            r#"
            UPDATE registration_requests
            SET status = 'cancelled', cancellation_reason = ?, updated_at = ?
            WHERE announcement_id = ? AND status IN ({})
            "#,
            status_list(&RegistrationStatus::ACTIVE)
        ))
        .bind(cancellation_reason)
        .bind(now)
        .bind(announcement_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .rows_affected();

        sqlx::query("DELETE FROM registration_forms WHERE announcement_id = ?")
            .bind(announcement_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let form = insert_form(&mut *tx, announcement_id, fields).await?;
        tx.commit().await?;

        Ok((form, cancelled))
    }

    async fn create(&self, request: NewRegistrationRequest) -> Result<RegistrationRequest> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO registration_requests (id, announcement_id, user_id, status, created_at, updated_at)
            VALUES (?, ?, ?, 'pending', ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(request.announcement_id.to_string())
        .bind(request.user_id.to_string())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Validation(
                "You already have an active registration request for this announcement".to_string(),
            ),
            other => AppError::Database(other.to_string()),
        })?;

        for response in &request.form_responses {
            sqlx::query(
                r#"
                INSERT INTO form_field_responses (id, registration_request_id, form_field_id, value)
                VALUES (?, ?, ?, ?)
                "#
            )
            .bind(Uuid::new_v4().to_string())
            .bind(id.to_string())
            .bind(response.form_field_id.to_string())
            .bind(&response.value)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        }

        let created = load_request(&mut tx, id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created registration request".to_string())
        })?;
        tx.commit().await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RegistrationRequest>> {
        let mut conn = self.pool.acquire().await?;
        load_request(&mut conn, id).await
    }

    async fn find_active(&self, announcement_id: Uuid, user_id: Uuid) -> Result<Option<RegistrationRequest>> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "{REQUEST_SELECT} WHERE r.announcement_id = ? AND r.user_id = ? AND r.status IN ({})",
            status_list(&RegistrationStatus::ACTIVE)
        ))
        .bind(announcement_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(row_to_request(&mut conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn list_by_announcement(
        &self,
        announcement_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RegistrationRequest>, i64)> {
        self.list_where("r.announcement_id = ?", announcement_id.to_string(), limit, offset)
            .await
    }

    async fn list_by_user(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<RegistrationRequest>, i64)> {
        self.list_where("r.user_id = ?", user_id.to_string(), limit, offset)
            .await
    }

    async fn approve(&self, id: Uuid) -> Result<RegistrationRequest> {
        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        let current = load_request(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Registration request not found".to_string()))?;

        if current.status == RegistrationStatus::Approved {
            return Ok(current);
        }
        current.status.ensure_can_transition(RegistrationStatus::Approved)?;

        let updated = sqlx::query(
            "UPDATE registration_requests SET status = 'approved', updated_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(now)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .rows_affected();

        // The participant row is only added alongside a real transition.
        if updated != 1 {
            return Err(AppError::Validation(format!(
                "Cannot change registration request from '{}' to '{}'",
                current.status.as_str(),
                RegistrationStatus::Approved.as_str()
            )));
        }

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO announcement_participants (id, announcement_id, user_id, joined_at)
            VALUES (?, ?, ?, ?)
            "#
        )
        .bind(Uuid::new_v4().to_string())
        .bind(current.announcement_id.to_string())
        .bind(current.user_id.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let approved = load_request(&mut tx, id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve approved registration request".to_string())
        })?;
        tx.commit().await?;

        tracing::info!(
            "Approved registration request {} for user {} on announcement {}",
            approved.id,
            approved.user_id,
            approved.announcement_id
        );
        Ok(approved)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: &[RegistrationStatus],
        to: RegistrationStatus,
        cancellation_reason: Option<String>,
    ) -> Result<RegistrationRequest> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(&format!(
            r#"
            UPDATE registration_requests
            SET status = ?, cancellation_reason = COALESCE(?, cancellation_reason), updated_at = ?
            WHERE id = ? AND status IN ({})
            "#,
            status_list(from)
        ))
        .bind(to.as_str())
        .bind(cancellation_reason)
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let current = load_request(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Registration request not found".to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::Validation(format!(
                "Cannot change registration request from '{}' to '{}'",
                current.status.as_str(),
                to.as_str()
            )));
        }
        tx.commit().await?;

        Ok(current)
    }
}
