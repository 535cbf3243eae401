use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::CreateFormFieldRequest;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Announcement {
    pub id: Uuid,
    pub game_id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub start_at: DateTime<Utc>,
    pub registration_start_at: DateTime<Utc>,
    pub registration_end_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub max_participants: i32,
    pub status: AnnouncementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    /// Registration is open on the closed interval `[registration_start_at, registration_end_at]`.
    pub fn is_registration_open(&self, now: DateTime<Utc>) -> bool {
        self.registration_start_at <= now && now <= self.registration_end_at
    }

    pub fn validate_schedule(&self) -> Result<()> {
        validate_schedule(self.registration_start_at, self.registration_end_at, self.start_at)
    }
}

/// Enforces `registration_start_at < registration_end_at <= start_at`.
pub fn validate_schedule(
    registration_start_at: DateTime<Utc>,
    registration_end_at: DateTime<Utc>,
    start_at: DateTime<Utc>,
) -> Result<()> {
    if registration_start_at >= registration_end_at {
        return Err(AppError::Validation(
            "Registration start must be before registration end".to_string(),
        ));
    }
    if registration_end_at > start_at {
        return Err(AppError::Validation(
            "Registration must end before or when the announcement starts".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementStatus {
    PreRegistration,
    RegistrationOpen,
    RegistrationClosed,
    Live,
    Paused,
    Finished,
    Cancelled,
}

impl AnnouncementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnouncementStatus::PreRegistration => "pre_registration",
            AnnouncementStatus::RegistrationOpen => "registration_open",
            AnnouncementStatus::RegistrationClosed => "registration_closed",
            AnnouncementStatus::Live => "live",
            AnnouncementStatus::Paused => "paused",
            AnnouncementStatus::Finished => "finished",
            AnnouncementStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pre_registration" => Some(AnnouncementStatus::PreRegistration),
            "registration_open" => Some(AnnouncementStatus::RegistrationOpen),
            "registration_closed" => Some(AnnouncementStatus::RegistrationClosed),
            "live" => Some(AnnouncementStatus::Live),
            "paused" => Some(AnnouncementStatus::Paused),
            "finished" => Some(AnnouncementStatus::Finished),
            "cancelled" => Some(AnnouncementStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnnouncementStatus::Finished | AnnouncementStatus::Cancelled)
    }

    /// Status a freshly created announcement starts in.
    pub fn initial(registration_start_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if registration_start_at <= now {
            AnnouncementStatus::RegistrationOpen
        } else {
            AnnouncementStatus::PreRegistration
        }
    }

    /// Applies a manual status action, returning the target status.
    pub fn apply(&self, action: AnnouncementAction) -> Result<Self> {
        match action {
            AnnouncementAction::Finish => {
                if *self != AnnouncementStatus::Live {
                    return Err(AppError::Validation(
                        "Can only finish announcement when it is 'live'".to_string(),
                    ));
                }
                Ok(AnnouncementStatus::Finished)
            }
            AnnouncementAction::Cancel => {
                if self.is_terminal() {
                    return Err(AppError::Validation(format!(
                        "Cannot cancel an announcement that is already '{}'",
                        self.as_str()
                    )));
                }
                Ok(AnnouncementStatus::Cancelled)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementAction {
    Finish,
    Cancel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementStatusUpdate {
    pub action: AnnouncementAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnouncementParticipant {
    pub announcement_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub nickname: Option<String>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAnnouncementRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub content: Option<String>,
    pub game_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub registration_start_at: DateTime<Utc>,
    pub registration_end_at: DateTime<Utc>,
    #[validate(range(min = 1))]
    pub max_participants: i32,
    #[validate(nested)]
    pub registration_form: Option<RegistrationFormInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Validate)]
pub struct UpdateAnnouncementRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub content: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub registration_start_at: Option<DateTime<Utc>>,
    pub registration_end_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub max_participants: Option<i32>,
}

impl UpdateAnnouncementRequest {
    /// Merges the update onto `announcement` and checks the schedule on the result.
    pub fn apply_to(&self, announcement: &Announcement) -> Result<Announcement> {
        let mut updated = announcement.clone();
        if let Some(ref title) = self.title {
            updated.title = title.clone();
        }
        if let Some(ref content) = self.content {
            updated.content = Some(content.clone());
        }
        if let Some(start_at) = self.start_at {
            updated.start_at = start_at;
        }
        if let Some(registration_start_at) = self.registration_start_at {
            updated.registration_start_at = registration_start_at;
        }
        if let Some(registration_end_at) = self.registration_end_at {
            updated.registration_end_at = registration_end_at;
        }
        if let Some(max_participants) = self.max_participants {
            updated.max_participants = max_participants;
        }
        updated.validate_schedule()?;
        Ok(updated)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Validate)]
pub struct RegistrationFormInput {
    #[validate(nested)]
    pub fields: Vec<CreateFormFieldRequest>,
}
