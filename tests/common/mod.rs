#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tourney::{
    domain::*,
    repository::{GameRepository, UserRepository},
    service::ServiceContext,
};
use uuid::Uuid;

/// In-memory database with the schema applied. A single connection keeps
/// every query on the same database.
pub async fn setup_pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

pub async fn setup() -> anyhow::Result<Arc<ServiceContext>> {
    Ok(Arc::new(ServiceContext::new(setup_pool().await?)))
}

pub async fn create_user(ctx: &ServiceContext, is_superuser: bool) -> anyhow::Result<User> {
    let user = ctx
        .user_repo
        .create(CreateUserRequest {
            email: format!("{}@example.com", Uuid::new_v4()),
            nickname: Some("player".to_string()),
            is_superuser,
        })
        .await?;
    Ok(user)
}

pub async fn create_game(ctx: &ServiceContext, name: &str) -> anyhow::Result<Game> {
    let game = ctx
        .game_repo
        .create(CreateGameRequest {
            name: name.to_string(),
            description: None,
            image_url: Some(format!("https://img.example.com/{}.png", name)),
        })
        .await?;
    Ok(game)
}

/// Registration window relative to now, in hours, plus the start time.
pub struct Schedule {
    pub registration_start_at: DateTime<Utc>,
    pub registration_end_at: DateTime<Utc>,
    pub start_at: DateTime<Utc>,
}

impl Schedule {
    pub fn hours(registration_start: i64, registration_end: i64, start: i64) -> Self {
        let now = Utc::now();
        Self {
            registration_start_at: now + Duration::hours(registration_start),
            registration_end_at: now + Duration::hours(registration_end),
            start_at: now + Duration::hours(start),
        }
    }

    /// Registration opened an hour ago and closes in an hour.
    pub fn open() -> Self {
        Self::hours(-1, 1, 24)
    }
}

pub fn announcement_request(
    game: &Game,
    title: &str,
    schedule: Schedule,
    form: Option<Vec<CreateFormFieldRequest>>,
) -> CreateAnnouncementRequest {
    CreateAnnouncementRequest {
        title: title.to_string(),
        content: None,
        game_id: game.id,
        start_at: schedule.start_at,
        registration_start_at: schedule.registration_start_at,
        registration_end_at: schedule.registration_end_at,
        max_participants: 16,
        registration_form: form.map(|fields| RegistrationFormInput { fields }),
    }
}

pub async fn create_announcement(
    ctx: &ServiceContext,
    organizer: &User,
    game: &Game,
    schedule: Schedule,
    form: Option<Vec<CreateFormFieldRequest>>,
) -> anyhow::Result<Announcement> {
    let announcement = ctx
        .announcement_service
        .create(Some(organizer), announcement_request(game, "Weekend Cup", schedule, form))
        .await?;
    Ok(announcement)
}

pub fn text_field(label: &str, required: bool) -> CreateFormFieldRequest {
    CreateFormFieldRequest {
        field_type: FormFieldType::Text,
        label: label.to_string(),
        required,
        options: None,
    }
}

pub fn answer(field: &FormField, value: &str) -> FormFieldResponseInput {
    FormFieldResponseInput {
        form_field_id: field.id,
        value: value.to_string(),
    }
}
