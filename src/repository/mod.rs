use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;
use crate::domain::*;
use crate::error::{AppError, Result};

pub mod user_repository;
pub mod game_repository;
pub mod announcement_repository;
pub mod registration_repository;

pub use user_repository::SqliteUserRepository;
pub use game_repository::SqliteGameRepository;
pub use announcement_repository::SqliteAnnouncementRepository;
pub use registration_repository::SqliteRegistrationRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: CreateUserRequest) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<User>;
}

#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn create(&self, game: CreateGameRequest) -> Result<Game>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Game>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Game>>;
    async fn update(&self, id: Uuid, update: UpdateGameRequest) -> Result<Game>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    async fn count_announcements(&self, id: Uuid) -> Result<i64>;
}

#[async_trait]
pub trait AnnouncementRepository: Send + Sync {
    /// Inserts the announcement and, when given, its registration form in one transaction.
    async fn create(
        &self,
        announcement: Announcement,
        form: Option<Vec<CreateFormFieldRequest>>,
    ) -> Result<Announcement>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Announcement>>;
    async fn update(&self, announcement: &Announcement) -> Result<Announcement>;
    /// Moves the announcement from `from` to `to`. Fails with `Validation`
    /// when the stored status is no longer `from`.
    async fn update_status(
        &self,
        id: Uuid,
        from: AnnouncementStatus,
        to: AnnouncementStatus,
        end_at: Option<DateTime<Utc>>,
    ) -> Result<Announcement>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    async fn list_by_organizer(&self, organizer_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<Announcement>, i64)>;
    async fn list_by_participant(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<Announcement>, i64)>;
    async fn list_participants(
        &self,
        announcement_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AnnouncementParticipant>, i64)>;
    async fn is_participant(&self, announcement_id: Uuid, user_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn find_form(&self, announcement_id: Uuid) -> Result<Option<RegistrationForm>>;
    /// Cancels active requests with `cancellation_reason`, drops the old form and
    /// installs a new one, atomically. Returns the new form and how many
    /// requests were cancelled.
    async fn replace_form(
        &self,
        announcement_id: Uuid,
        fields: &[CreateFormFieldRequest],
        cancellation_reason: &str,
    ) -> Result<(RegistrationForm, u64)>;
    async fn create(&self, request: NewRegistrationRequest) -> Result<RegistrationRequest>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<RegistrationRequest>>;
    async fn find_active(&self, announcement_id: Uuid, user_id: Uuid) -> Result<Option<RegistrationRequest>>;
    async fn list_by_announcement(
        &self,
        announcement_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RegistrationRequest>, i64)>;
    async fn list_by_user(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<RegistrationRequest>, i64)>;
    /// Moves a pending request to approved and adds the requester to the
    /// announcement's participants in the same transaction.
    async fn approve(&self, id: Uuid) -> Result<RegistrationRequest>;
    /// Moves a request to `to` only if it is currently in one of `from`.
    async fn transition(
        &self,
        id: Uuid,
        from: &[RegistrationStatus],
        to: RegistrationStatus,
        cancellation_reason: Option<String>,
    ) -> Result<RegistrationRequest>;
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

pub(crate) fn to_utc(dt: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(dt, Utc)
}
