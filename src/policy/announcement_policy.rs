use super::{Action, EntityKind, Policy, PolicyContext, PolicyError, Rule};

/// Any active user may announce a tournament; only its organizer or an
/// admin may change or remove it.
pub struct AnnouncementPolicy;

fn can_create(ctx: &PolicyContext<'_>) -> Result<bool, PolicyError> {
    Ok(ctx.user.map(|u| u.is_active).unwrap_or(false))
}

fn can_edit(ctx: &PolicyContext<'_>) -> Result<bool, PolicyError> {
    is_admin_or_organizer(ctx)
}

fn can_delete(ctx: &PolicyContext<'_>) -> Result<bool, PolicyError> {
    is_admin_or_organizer(ctx)
}

fn is_admin_or_organizer(ctx: &PolicyContext<'_>) -> Result<bool, PolicyError> {
    if ctx.is_admin() {
        return Ok(true);
    }
    let user = ctx.user()?;
    Ok(user.id == ctx.announcement()?.organizer_id)
}

static RULES: [Rule; 3] = [
    Rule { action: Action::Create, check: can_create },
    Rule { action: Action::Edit, check: can_edit },
    Rule { action: Action::Delete, check: can_delete },
];

impl Policy for AnnouncementPolicy {
    fn entity(&self) -> EntityKind {
        EntityKind::Announcement
    }

    fn name(&self) -> &'static str {
        "AnnouncementPolicy"
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
        (AnnouncementPolicy.rule(action).unwrap().check)(ctx)
    }

    #[test]
    fn test_create_requires_active_user() {
        let mut user = fixtures::user(false);
        assert_eq!(check(Action::Create, &PolicyContext::new(Some(&user), None)), Ok(true));
        user.is_active = false;
        assert_eq!(check(Action::Create, &PolicyContext::new(Some(&user), None)), Ok(false));
        assert_eq!(check(Action::Create, &PolicyContext::new(None, None)), Ok(false));
    }

    #[test]
    fn test_edit_and_delete() {
        let organizer = fixtures::user(false);
        let stranger = fixtures::user(false);
        let admin = fixtures::user(true);
        let announcement = fixtures::announcement(&organizer);
        let record = Some(announcement.as_record());

        for action in [Action::Edit, Action::Delete] {
            assert_eq!(check(action, &PolicyContext::new(Some(&organizer), record)), Ok(true));
            assert_eq!(check(action, &PolicyContext::new(Some(&admin), record)), Ok(true));
            assert_eq!(check(action, &PolicyContext::new(Some(&stranger), record)), Ok(false));
            assert_eq!(
                check(action, &PolicyContext::new(None, record)),
                Err(PolicyError::MissingUser)
            );
        }
    }
}
