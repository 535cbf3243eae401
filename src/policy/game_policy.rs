use super::{Action, EntityKind, Policy, PolicyContext, PolicyError, Rule};

/// The game catalog is curated by admins only.
pub struct GamePolicy;

fn admin_only(ctx: &PolicyContext<'_>) -> Result<bool, PolicyError> {
    Ok(ctx.is_admin())
}

static RULES: [Rule; 3] = [
    Rule { action: Action::Create, check: admin_only },
    Rule { action: Action::Edit, check: admin_only },
    Rule { action: Action::Delete, check: admin_only },
];

impl Policy for GamePolicy {
    fn entity(&self) -> EntityKind {
        EntityKind::Game
    }

    fn name(&self) -> &'static str {
        "GamePolicy"
    }

    fn rules(&self) -> &'static [Rule] {
        &RULES
    }
}
