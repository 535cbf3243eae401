use super::{Action, EntityKind, Policy, PolicyContext, PolicyError, Rule};

/// Organizers review requests for their announcements; requesters may view
/// and withdraw their own.
pub struct RegistrationRequestPolicy;

fn can_view(ctx: &PolicyContext<'_>) -> Result<bool, PolicyError> {
    if ctx.is_admin() {
        return Ok(true);
    }
    let user = ctx.user()?;
    let request = ctx.registration_request()?;
    Ok(user.id == request.user_id || user.id == request.organizer_id)
}

fn can_review(ctx: &PolicyContext<'_>) -> Result<bool, PolicyError> {
    if ctx.is_admin() {
        return Ok(true);
    }
    let user = ctx.user()?;
    Ok(user.id == ctx.registration_request()?.organizer_id)
}

static RULES: [Rule; 4] = [
    Rule { action: Action::View, check: can_view },
    Rule { action: Action::Approve, check: can_review },
    Rule { action: Action::Reject, check: can_review },
    Rule { action: Action::Cancel, check: can_view },
];

impl Policy for RegistrationRequestPolicy {
    fn entity(&self) -> EntityKind {
        EntityKind::RegistrationRequest
    }

    fn name(&self) -> &'static str {
        "RegistrationRequestPolicy"
    }

    fn rules(&self) -> &'static [Rule] {
        &RULES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{fixtures, Authorizable};

    fn check(action: Action, ctx: &PolicyContext<'_>) -> Result<bool, PolicyError> {
        (RegistrationRequestPolicy.rule(action).unwrap().check)(ctx)
    }

    #[test]
    fn test_review_and_cancel_rights() {
        let organizer = fixtures::user(false);
        let requester = fixtures::user(false);
        let stranger = fixtures::user(false);
        let admin = fixtures::user(true);
        let announcement = fixtures::announcement(&organizer);
        let request = fixtures::registration_request(&announcement, &requester);
        let record = Some(request.as_record());

        for action in [Action::Approve, Action::Reject] {
            assert_eq!(check(action, &PolicyContext::new(Some(&organizer), record)), Ok(true));
            assert_eq!(check(action, &PolicyContext::new(Some(&admin), record)), Ok(true));
            assert_eq!(check(action, &PolicyContext::new(Some(&requester), record)), Ok(false));
            assert_eq!(check(action, &PolicyContext::new(Some(&stranger), record)), Ok(false));
        }

        for action in [Action::View, Action::Cancel] {
            assert_eq!(check(action, &PolicyContext::new(Some(&organizer), record)), Ok(true));
            assert_eq!(check(action, &PolicyContext::new(Some(&admin), record)), Ok(true));
            assert_eq!(check(action, &PolicyContext::new(Some(&requester), record)), Ok(true));
            assert_eq!(check(action, &PolicyContext::new(Some(&stranger), record)), Ok(false));
        }

        assert_eq!(
            check(Action::Approve, &PolicyContext::new(None, record)),
            Err(PolicyError::MissingUser)
        );
    }

    #[test]
    fn test_has_no_global_actions() {
        assert!(RegistrationRequestPolicy.rules().iter().all(|r| !r.action.is_global()));
    }
}
