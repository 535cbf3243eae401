use std::sync::Arc;

use crate::{
    domain::User,
    error::{AppError, Result},
};

use super::{Action, Authorizable, EntityKind, Policy, PolicyContext, PolicyRegistry, RecordRef};

/// Binary gate for a (user, record, action) triple.
pub struct AuthorizationService {
    registry: Arc<PolicyRegistry>,
}

impl AuthorizationService {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self { registry }
    }

    /// Returns `Ok(())` when `user` may perform `action` on `record`.
    ///
    /// Fails with [`AppError::Forbidden`] on denial, and with
    /// [`AppError::PolicyNotFound`] / [`AppError::PolicyMethodNotFound`] when
    /// the policy table has no answer for the request.
    pub fn authorize<R: Authorizable>(&self, user: Option<&User>, record: &R, action: &str) -> Result<()> {
        let policy = self.registry.policy_for(record)?;
        self.check(policy, user, Some(record.as_record()), action)
    }

    /// Checks an action that is not tied to a record, such as `create`.
    pub fn authorize_global(&self, user: Option<&User>, kind: EntityKind, action: &str) -> Result<()> {
        let policy = self.registry.policy_for_kind(kind)?;
        self.check(policy, user, None, action)
    }

    fn check(
        &self,
        policy: &'static dyn Policy,
        user: Option<&User>,
        record: Option<RecordRef<'_>>,
        action: &str,
    ) -> Result<()> {
        let rule = Action::from_str(action)
            .and_then(|a| policy.rule(a))
            .ok_or_else(|| AppError::PolicyMethodNotFound {
                policy: policy.name().to_string(),
                action: action.to_string(),
            })?;

        match (rule.check)(&PolicyContext::new(user, record)) {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::Forbidden),
            Err(e) => {
                tracing::error!("Error in policy check {}::{}: {}", policy.name(), action, e);
                Err(AppError::Forbidden)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{fixtures, GamePolicy};

    fn service() -> AuthorizationService {
        AuthorizationService::new(Arc::new(PolicyRegistry::default()))
    }

    #[test]
    fn test_organizer_may_edit() {
        let organizer = fixtures::user(false);
        let announcement = fixtures::announcement(&organizer);
        assert!(service().authorize(Some(&organizer), &announcement, "edit").is_ok());
    }

    #[test]
    fn test_stranger_is_forbidden() {
        let organizer = fixtures::user(false);
        let stranger = fixtures::user(false);
        let announcement = fixtures::announcement(&organizer);
        let err = service()
            .authorize(Some(&stranger), &announcement, "delete")
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn test_anonymous_scoped_check_is_denied_not_crashed() {
        let organizer = fixtures::user(false);
        let announcement = fixtures::announcement(&organizer);
        let err = service().authorize(None, &announcement, "edit").unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn test_unknown_action_is_configuration_error() {
        let organizer = fixtures::user(false);
        let announcement = fixtures::announcement(&organizer);

        let err = service()
            .authorize(Some(&organizer), &announcement, "approve")
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::PolicyMethodNotFound { ref policy, ref action }
                if policy == "AnnouncementPolicy" && action == "approve"
        ));

        let err = service()
            .authorize(Some(&organizer), &announcement, "teleport")
            .unwrap_err();
        assert!(matches!(err, AppError::PolicyMethodNotFound { .. }));
    }

    #[test]
    fn test_missing_policy_is_configuration_error() {
        let registry = PolicyRegistry::new(vec![&GamePolicy as &'static dyn Policy]);
        let service = AuthorizationService::new(Arc::new(registry));
        let organizer = fixtures::user(false);
        let announcement = fixtures::announcement(&organizer);

        let err = service
            .authorize(Some(&organizer), &announcement, "edit")
            .unwrap_err();
        assert!(matches!(err, AppError::PolicyNotFound { .. }));
    }

    #[test]
    fn test_global_create() {
        let player = fixtures::user(false);
        let admin = fixtures::user(true);
        let service = service();

        assert!(service
            .authorize_global(Some(&player), EntityKind::Announcement, "create")
            .is_ok());
        assert!(matches!(
            service.authorize_global(Some(&player), EntityKind::Game, "create"),
            Err(AppError::Forbidden)
        ));
        assert!(service
            .authorize_global(Some(&admin), EntityKind::Game, "create")
            .is_ok());
        assert!(matches!(
            service.authorize_global(None, EntityKind::Announcement, "create"),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_scoped_action_without_record_is_denied() {
        let player = fixtures::user(false);
        assert!(matches!(
            service().authorize_global(Some(&player), EntityKind::Announcement, "edit"),
            Err(AppError::Forbidden)
        ));
    }
}
