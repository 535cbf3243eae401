//! Per-entity authorization policies.
//!
//! Every entity kind that can be authorized has exactly one [`Policy`],
//! registered in a [`PolicyRegistry`]. A policy is a static table of
//! [`Rule`]s, one per supported [`Action`]. Actions are either *global*
//! (checked without a record, e.g. `create`) or *scoped* (checked against a
//! specific record).
//!
//! [`AuthorizationService`] enforces a single action and
//! [`PermissionsService`] reports what a user may do, for API responses.

pub mod authorization;
pub mod permissions;
pub mod registry;

mod announcement_policy;
mod game_policy;
mod registration_request_policy;

pub use announcement_policy::AnnouncementPolicy;
pub use authorization::AuthorizationService;
pub use game_policy::GamePolicy;
pub use permissions::PermissionsService;
pub use registration_request_policy::RegistrationRequestPolicy;
pub use registry::PolicyRegistry;

use thiserror::Error;

use crate::domain::{Announcement, Game, RegistrationRequest, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Announcement,
    Game,
    RegistrationRequest,
}

impl EntityKind {
    /// Type name the policy is derived from (`<name>Policy`).
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Announcement => "Announcement",
            EntityKind::Game => "Game",
            EntityKind::RegistrationRequest => "RegistrationRequest",
        }
    }

    /// Key used in global permission maps.
    pub fn key(&self) -> &'static str {
        match self {
            EntityKind::Announcement => "announcement",
            EntityKind::Game => "game",
            EntityKind::RegistrationRequest => "registration_request",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Create,
    View,
    Edit,
    Delete,
    Approve,
    Reject,
    Cancel,
}

/// Actions that are checked without a record instance.
const GLOBAL_ACTIONS: &[Action] = &[Action::Create];

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::View => "view",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Cancel => "cancel",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Action::Create),
            "view" => Some(Action::View),
            "edit" => Some(Action::Edit),
            "delete" => Some(Action::Delete),
            "approve" => Some(Action::Approve),
            "reject" => Some(Action::Reject),
            "cancel" => Some(Action::Cancel),
            _ => None,
        }
    }

    pub fn is_global(&self) -> bool {
        GLOBAL_ACTIONS.contains(self)
    }
}

/// Borrowed view of any record a policy can be asked about.
#[derive(Debug, Clone, Copy)]
pub enum RecordRef<'a> {
    Announcement(&'a Announcement),
    Game(&'a Game),
    RegistrationRequest(&'a RegistrationRequest),
}

impl RecordRef<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            RecordRef::Announcement(_) => EntityKind::Announcement,
            RecordRef::Game(_) => EntityKind::Game,
            RecordRef::RegistrationRequest(_) => EntityKind::RegistrationRequest,
        }
    }
}

/// Implemented by every domain type that has a policy.
pub trait Authorizable {
    const KIND: EntityKind;

    fn as_record(&self) -> RecordRef<'_>;
}

impl Authorizable for Announcement {
    const KIND: EntityKind = EntityKind::Announcement;

    fn as_record(&self) -> RecordRef<'_> {
        RecordRef::Announcement(self)
    }
}

impl Authorizable for Game {
    const KIND: EntityKind = EntityKind::Game;

    fn as_record(&self) -> RecordRef<'_> {
        RecordRef::Game(self)
    }
}

impl Authorizable for RegistrationRequest {
    const KIND: EntityKind = EntityKind::RegistrationRequest;

    fn as_record(&self) -> RecordRef<'_> {
        RecordRef::RegistrationRequest(self)
    }
}

/// A predicate could not be evaluated. Always treated as a denial.
#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("policy check requires an authenticated user")]
    MissingUser,

    #[error("policy check requires a {0} record")]
    MissingRecord(&'static str),

    #[error("policy check expected a {expected} record, got {actual}")]
    RecordMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Inputs to a single predicate evaluation.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    pub user: Option<&'a User>,
    pub record: Option<RecordRef<'a>>,
}

impl<'a> PolicyContext<'a> {
    pub fn new(user: Option<&'a User>, record: Option<RecordRef<'a>>) -> Self {
        Self { user, record }
    }

    /// Only an existing superuser is an admin.
    pub fn is_admin(&self) -> bool {
        self.user.map(|u| u.is_superuser).unwrap_or(false)
    }

    pub fn user(&self) -> Result<&'a User, PolicyError> {
        self.user.ok_or(PolicyError::MissingUser)
    }

    fn record(&self, expected: EntityKind) -> Result<RecordRef<'a>, PolicyError> {
        let record = self.record.ok_or(PolicyError::MissingRecord(expected.name()))?;
        if record.kind() != expected {
            return Err(PolicyError::RecordMismatch {
                expected: expected.name(),
                actual: record.kind().name(),
            });
        }
        Ok(record)
    }

    pub fn announcement(&self) -> Result<&'a Announcement, PolicyError> {
        match self.record(EntityKind::Announcement)? {
            RecordRef::Announcement(a) => Ok(a),
            other => Err(PolicyError::RecordMismatch {
                expected: EntityKind::Announcement.name(),
                actual: other.kind().name(),
            }),
        }
    }

    pub fn game(&self) -> Result<&'a Game, PolicyError> {
        match self.record(EntityKind::Game)? {
            RecordRef::Game(g) => Ok(g),
            other => Err(PolicyError::RecordMismatch {
                expected: EntityKind::Game.name(),
                actual: other.kind().name(),
            }),
        }
    }

    pub fn registration_request(&self) -> Result<&'a RegistrationRequest, PolicyError> {
        match self.record(EntityKind::RegistrationRequest)? {
            RecordRef::RegistrationRequest(r) => Ok(r),
            other => Err(PolicyError::RecordMismatch {
                expected: EntityKind::RegistrationRequest.name(),
                actual: other.kind().name(),
            }),
        }
    }
}

pub type Predicate = fn(&PolicyContext<'_>) -> Result<bool, PolicyError>;

/// One `can_<action>` predicate of a policy.
pub struct Rule {
    pub action: Action,
    pub check: Predicate,
}

pub trait Policy: Send + Sync + 'static {
    fn entity(&self) -> EntityKind;

    fn name(&self) -> &'static str;

    fn rules(&self) -> &'static [Rule];

    fn rule(&self, action: Action) -> Option<&'static Rule> {
        self.rules().iter().find(|r| r.action == action)
    }
}

impl std::fmt::Debug for dyn Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_create_is_global() {
        assert!(Action::Create.is_global());
        for action in [
            Action::View,
            Action::Edit,
            Action::Delete,
            Action::Approve,
            Action::Reject,
            Action::Cancel,
        ] {
            assert!(!action.is_global(), "{} should be scoped", action.as_str());
            assert_eq!(Action::from_str(action.as_str()), Some(action));
        }
        assert_eq!(Action::from_str("publish"), None);
    }

    #[test]
    fn test_context_is_admin() {
        let admin = fixtures::user(true);
        let player = fixtures::user(false);
        assert!(PolicyContext::new(Some(&admin), None).is_admin());
        assert!(!PolicyContext::new(Some(&player), None).is_admin());
        assert!(!PolicyContext::new(None, None).is_admin());
    }

    #[test]
    fn test_context_record_accessors() {
        let organizer = fixtures::user(false);
        let announcement = fixtures::announcement(&organizer);
        let ctx = PolicyContext::new(Some(&organizer), Some(announcement.as_record()));
        assert_eq!(ctx.announcement().unwrap().id, announcement.id);
        assert_eq!(
            ctx.game().unwrap_err(),
            PolicyError::RecordMismatch {
                expected: "Game",
                actual: "Announcement"
            }
        );

        let empty = PolicyContext::new(None, None);
        assert_eq!(empty.user().unwrap_err(), PolicyError::MissingUser);
        assert_eq!(
            empty.announcement().unwrap_err(),
            PolicyError::MissingRecord("Announcement")
        );
    }
}
