use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::*,
    error::{AppError, Result},
    policy::{AuthorizationService, EntityKind},
    repository::{AnnouncementRepository, GameRepository, RegistrationRepository},
    search::{AnnouncementFilter, AnnouncementSearch, Search},
};

/// Announcement CRUD, manual status actions and form replacement.
///
/// Time-driven status changes live in [`crate::tasks`]; this service only
/// performs the explicit `finish` and `cancel` actions.
pub struct AnnouncementService {
    repo: Arc<dyn AnnouncementRepository>,
    game_repo: Arc<dyn GameRepository>,
    registration_repo: Arc<dyn RegistrationRepository>,
    search: AnnouncementSearch,
    authorization: Arc<AuthorizationService>,
}

impl AnnouncementService {
    pub fn new(
        repo: Arc<dyn AnnouncementRepository>,
        game_repo: Arc<dyn GameRepository>,
        registration_repo: Arc<dyn RegistrationRepository>,
        search: AnnouncementSearch,
        authorization: Arc<AuthorizationService>,
    ) -> Self {
        Self {
            repo,
            game_repo,
            registration_repo,
            search,
            authorization,
        }
    }

    pub async fn create(&self, user: Option<&User>, request: CreateAnnouncementRequest) -> Result<Announcement> {
        self.authorization
            .authorize_global(user, EntityKind::Announcement, "create")?;
        let organizer = user.ok_or(AppError::Forbidden)?;

        request.validate()?;
        validate_schedule(
            request.registration_start_at,
            request.registration_end_at,
            request.start_at,
        )?;

        let game = self
            .game_repo
            .find_by_id(request.game_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;

        let now = Utc::now();
        let announcement = Announcement {
            id: Uuid::new_v4(),
            game_id: game.id,
            organizer_id: organizer.id,
            title: request.title,
            content: request.content,
            image_url: game.image_url,
            start_at: request.start_at,
            registration_start_at: request.registration_start_at,
            registration_end_at: request.registration_end_at,
            end_at: None,
            max_participants: request.max_participants,
            status: AnnouncementStatus::initial(request.registration_start_at, now),
            created_at: now,
            updated_at: now,
        };

        let form = request.registration_form.map(|f| f.fields);
        let created = self.repo.create(announcement, form).await?;
        tracing::info!(
            "Announcement {} created by {} in status {}",
            created.id,
            organizer.id,
            created.status.as_str()
        );
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<Announcement> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Announcement not found".to_string()))
    }

    /// Partial update. The merged record must still satisfy the schedule
    /// ordering, otherwise nothing is written.
    pub async fn update(
        &self,
        user: Option<&User>,
        id: Uuid,
        request: UpdateAnnouncementRequest,
    ) -> Result<Announcement> {
        let announcement = self.get(id).await?;
        self.authorization.authorize(user, &announcement, "edit")?;
        request.validate()?;

        let updated = request.apply_to(&announcement)?;
        self.repo.update(&updated).await
    }

    pub async fn delete(&self, user: Option<&User>, id: Uuid) -> Result<()> {
        let announcement = self.get(id).await?;
        self.authorization.authorize(user, &announcement, "delete")?;
        self.repo.delete(id).await?;
        tracing::info!("Announcement {} deleted", id);
        Ok(())
    }

    pub async fn update_status(
        &self,
        user: Option<&User>,
        id: Uuid,
        action: AnnouncementAction,
    ) -> Result<Announcement> {
        let announcement = self.get(id).await?;
        self.authorization.authorize(user, &announcement, "edit")?;

        let target = announcement.status.apply(action)?;
        let end_at = match action {
            AnnouncementAction::Finish => Some(Utc::now()),
            AnnouncementAction::Cancel => None,
        };

        let updated = self
            .repo
            .update_status(id, announcement.status, target, end_at)
            .await?;
        tracing::info!(
            "Announcement {} moved from {} to {}",
            id,
            announcement.status.as_str(),
            updated.status.as_str()
        );
        Ok(updated)
    }

    pub async fn registration_form(&self, id: Uuid) -> Result<Option<RegistrationForm>> {
        self.get(id).await?;
        self.registration_repo.find_form(id).await
    }

    /// Installs a new form, cancelling every active request made against the
    /// old one. Returns the form and the number of cancelled requests.
    pub async fn replace_registration_form(
        &self,
        user: Option<&User>,
        id: Uuid,
        input: RegistrationFormInput,
    ) -> Result<(RegistrationForm, u64)> {
        let announcement = self.get(id).await?;
        self.authorization.authorize(user, &announcement, "edit")?;
        input.validate()?;

        let (form, cancelled) = self
            .registration_repo
            .replace_form(id, &input.fields, FORM_REPLACED_REASON)
            .await?;

        if cancelled > 0 {
            tracing::info!(
                "Registration form of announcement {} replaced, cancelled {} requests",
                id,
                cancelled
            );
        }
        Ok((form, cancelled))
    }

    pub async fn participants(
        &self,
        id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<AnnouncementParticipant>, i64)> {
        self.get(id).await?;
        self.repo.list_participants(id, limit, skip).await
    }

    pub async fn organized_by(&self, user_id: Uuid, skip: i64, limit: i64) -> Result<(Vec<Announcement>, i64)> {
        self.repo.list_by_organizer(user_id, limit, skip).await
    }

    pub async fn participating_in(&self, user_id: Uuid, skip: i64, limit: i64) -> Result<(Vec<Announcement>, i64)> {
        self.repo.list_by_participant(user_id, limit, skip).await
    }

    pub async fn search(
        &self,
        filter: &AnnouncementFilter,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<Announcement>, i64)> {
        let items = self.search.results(filter, skip, limit).await?;
        let count = self.search.count(filter).await?;
        Ok((items, count))
    }
}
