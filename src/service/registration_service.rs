use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    policy::AuthorizationService,
    repository::{AnnouncementRepository, RegistrationRepository},
};

pub struct RegistrationService {
    repo: Arc<dyn RegistrationRepository>,
    announcement_repo: Arc<dyn AnnouncementRepository>,
    authorization: Arc<AuthorizationService>,
}

impl RegistrationService {
    pub fn new(
        repo: Arc<dyn RegistrationRepository>,
        announcement_repo: Arc<dyn AnnouncementRepository>,
        authorization: Arc<AuthorizationService>,
    ) -> Self {
        Self {
            repo,
            announcement_repo,
            authorization,
        }
    }

    /// Submits a registration request for `user`.
    ///
    /// The registration window must be open, the user must not already hold
    /// an active request, and the answers must match the announcement's form.
    pub async fn create(
        &self,
        user: Option<&User>,
        announcement_id: Uuid,
        request: CreateRegistrationRequest,
    ) -> Result<RegistrationRequest> {
        let user = user.ok_or(AppError::Unauthorized)?;
        let announcement = self.find_announcement(announcement_id).await?;

        if !announcement.is_registration_open(Utc::now()) {
            return Err(AppError::Validation(
                "Registration is currently closed for this announcement".to_string(),
            ));
        }

        if self.repo.find_active(announcement_id, user.id).await?.is_some() {
            return Err(AppError::Validation(
                "You already have an active registration request for this announcement".to_string(),
            ));
        }

        let form = self.repo.find_form(announcement_id).await?;
        validate_form_responses(form.as_ref(), &request.form_responses)?;

        let created = self
            .repo
            .create(NewRegistrationRequest {
                announcement_id,
                user_id: user.id,
                form_responses: request.form_responses,
            })
            .await?;

        tracing::info!(
            "Registration request {} submitted by {} for announcement {}",
            created.id,
            user.id,
            announcement_id
        );
        Ok(created)
    }

    pub async fn get(&self, user: Option<&User>, id: Uuid) -> Result<RegistrationRequest> {
        let request = self.find(id).await?;
        self.authorization.authorize(user, &request, "view")?;
        Ok(request)
    }

    /// Approves a pending request and adds the requester to the participants.
    /// Approving an already approved request changes nothing.
    pub async fn approve(&self, user: Option<&User>, id: Uuid) -> Result<RegistrationRequest> {
        let request = self.find(id).await?;
        self.authorization.authorize(user, &request, "approve")?;
        self.repo.approve(id).await
    }

    pub async fn reject(
        &self,
        user: Option<&User>,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<RegistrationRequest> {
        let request = self.find(id).await?;
        self.authorization.authorize(user, &request, "reject")?;
        request.status.ensure_can_transition(RegistrationStatus::Rejected)?;

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        self.repo
            .transition(id, &[RegistrationStatus::Pending], RegistrationStatus::Rejected, reason)
            .await
    }

    pub async fn cancel(&self, user: Option<&User>, id: Uuid) -> Result<RegistrationRequest> {
        let request = self.find(id).await?;
        self.authorization.authorize(user, &request, "cancel")?;
        request.status.ensure_can_transition(RegistrationStatus::Cancelled)?;

        self.repo
            .transition(id, &RegistrationStatus::ACTIVE, RegistrationStatus::Cancelled, None)
            .await
    }

    /// Requests for an announcement; visible to whoever may edit it.
    pub async fn list_for_announcement(
        &self,
        user: Option<&User>,
        announcement_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<RegistrationRequest>, i64)> {
        let announcement = self.find_announcement(announcement_id).await?;
        self.authorization.authorize(user, &announcement, "edit")?;
        self.repo.list_by_announcement(announcement_id, limit, skip).await
    }

    pub async fn list_for_user(&self, user: &User, skip: i64, limit: i64) -> Result<(Vec<RegistrationRequest>, i64)> {
        self.repo.list_by_user(user.id, limit, skip).await
    }

    async fn find(&self, id: Uuid) -> Result<RegistrationRequest> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Registration request not found".to_string()))
    }

    async fn find_announcement(&self, id: Uuid) -> Result<Announcement> {
        self.announcement_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Announcement not found".to_string()))
    }
}
