use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{CreateUserRequest, User},
    error::{AppError, Result},
    repository::{parse_uuid, to_utc, UserRepository},
};

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    nickname: Option<String>,
    is_active: i32,
    is_superuser: i32,
    is_verified: i32,
    created_at: NaiveDateTime,
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: UserRow) -> Result<User> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            email: row.email,
            nickname: row.nickname,
            is_active: row.is_active != 0,
            is_superuser: row.is_superuser != 0,
            is_verified: row.is_verified != 0,
            created_at: to_utc(row.created_at),
        })
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, request: CreateUserRequest) -> Result<User> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, nickname, is_active, is_superuser, is_verified, created_at)
            VALUES (?, ?, ?, 1, ?, 0, ?)
            "#
        )
        .bind(id.to_string())
        .bind(&request.email)
        .bind(&request.nickname)
        .bind(request.is_superuser as i32)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created user".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, nickname, is_active, is_superuser, is_verified, created_at
            FROM users
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, nickname, is_active, is_superuser, is_verified, created_at
            FROM users
            WHERE email = ?
            "#
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<User> {
        sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(is_active as i32)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}
