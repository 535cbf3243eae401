use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{CreateGameRequest, Game, UpdateGameRequest},
    error::{AppError, Result},
    repository::{parse_uuid, to_utc, GameRepository},
    search::fold_case,
};

#[derive(FromRow)]
pub struct GameRow {
    id: String,
    name: String,
    description: Option<String>,
    image_url: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub(crate) const GAME_COLUMNS: &str =
    "g.id, g.name, g.description, g.image_url, g.created_at, g.updated_at";

pub struct SqliteGameRepository {
    pool: SqlitePool,
}

impl SqliteGameRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn row_to_game(row: GameRow) -> Result<Game> {
        Ok(Game {
            id: parse_uuid(&row.id)?,
            name: row.name,
            description: row.description,
            image_url: row.image_url,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }
}

#[async_trait]
impl GameRepository for SqliteGameRepository {
    async fn create(&self, request: CreateGameRequest) -> Result<Game> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO games (id, name, name_search, description, image_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(&request.name)
        .bind(fold_case(&request.name))
        .bind(&request.description)
        .bind(&request.image_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created game".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Game>> {
        let row = sqlx::query_as::<_, GameRow>(&format!(
            "SELECT {GAME_COLUMNS} FROM games g WHERE g.id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_game).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Game>> {
        let row = sqlx::query_as::<_, GameRow>(&format!(
            "SELECT {GAME_COLUMNS} FROM games g WHERE g.name = ?"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_game).transpose()
    }

    async fn update(&self, id: Uuid, update: UpdateGameRequest) -> Result<Game> {
        let mut game = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;

        if let Some(name) = update.name {
            game.name = name;
        }
        if let Some(description) = update.description {
            game.description = Some(description);
        }
        if let Some(image_url) = update.image_url {
            game.image_url = Some(image_url);
        }

        sqlx::query(
            r#"
            UPDATE games
            SET name = ?, name_search = ?, description = ?, image_url = ?, updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(&game.name)
        .bind(fold_case(&game.name))
        .bind(&game.description)
        .bind(&game.image_url)
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated game".to_string())
        })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM games WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count_announcements(&self, id: Uuid) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM announcements WHERE game_id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }
}
