use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    domain::{PermissionMap, User, WithPermissions},
    error::Result,
};

use super::{Authorizable, Policy, PolicyContext, PolicyRegistry, RecordRef};

/// Read-only capability introspection used to annotate API responses.
///
/// Never fails because of a predicate: anything that cannot be evaluated is
/// reported as `false`.
pub struct PermissionsService {
    registry: Arc<PolicyRegistry>,
}

impl PermissionsService {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self { registry }
    }

    /// Scoped permissions of `user` on one record.
    pub fn record_permissions<R: Authorizable>(&self, user: Option<&User>, record: &R) -> PermissionMap {
        match self.registry.policy_for(record) {
            Ok(policy) => self.from_policy(user, Some(record.as_record()), policy, false),
            Err(e) => {
                tracing::warn!("{}", e);
                PermissionMap::new()
            }
        }
    }

    pub fn annotate<R: Authorizable>(&self, user: Option<&User>, record: R) -> WithPermissions<R> {
        let permissions = self.record_permissions(user, &record);
        WithPermissions { record, permissions }
    }

    /// Annotates a homogeneous list, resolving the policy once.
    pub fn batch_permissions<R: Authorizable>(
        &self,
        user: Option<&User>,
        records: Vec<R>,
    ) -> Result<Vec<WithPermissions<R>>> {
        let Some(first) = records.first() else {
            return Ok(Vec::new());
        };
        let policy = self.registry.policy_for(first)?;

        Ok(records
            .into_iter()
            .map(|record| {
                let permissions = self.from_policy(user, Some(record.as_record()), policy, false);
                WithPermissions { record, permissions }
            })
            .collect())
    }

    /// Global permissions per entity, e.g. `{"announcement": {"create": true}}`.
    /// Anonymous users get an empty map.
    pub fn global_permissions(&self, user: Option<&User>) -> BTreeMap<String, PermissionMap> {
        if user.is_none() {
            return BTreeMap::new();
        }

        self.registry
            .all_policies()
            .values()
            .filter_map(|policy| {
                let permissions = self.from_policy(user, None, *policy, true);
                (!permissions.is_empty()).then(|| (policy.entity().key().to_string(), permissions))
            })
            .collect()
    }

    fn from_policy(
        &self,
        user: Option<&User>,
        record: Option<RecordRef<'_>>,
        policy: &'static dyn Policy,
        include_global: bool,
    ) -> PermissionMap {
        let ctx = PolicyContext::new(user, record);
        let mut permissions = PermissionMap::new();

        for (action, is_global) in self.registry.permission_methods(policy).iter() {
            if *is_global != include_global {
                continue;
            }

            if user.is_none() {
                permissions.insert(action.as_str().to_string(), false);
                continue;
            }

            let allowed = match policy.rule(*action) {
                Some(rule) => (rule.check)(&ctx).unwrap_or_else(|e| {
                    tracing::error!("Error checking permission '{}': {}", action.as_str(), e);
                    false
                }),
                None => false,
            };
            permissions.insert(action.as_str().to_string(), allowed);
        }

        permissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{fixtures, GamePolicy};

    fn service() -> PermissionsService {
        PermissionsService::new(Arc::new(PolicyRegistry::default()))
    }

    #[test]
    fn test_record_permissions_only_scoped() {
        let organizer = fixtures::user(false);
        let announcement = fixtures::announcement(&organizer);
        let permissions = service().record_permissions(Some(&organizer), &announcement);

        assert_eq!(permissions.get("edit"), Some(&true));
        assert_eq!(permissions.get("delete"), Some(&true));
        assert!(!permissions.contains_key("create"));
    }

    #[test]
    fn test_anonymous_gets_all_false() {
        let organizer = fixtures::user(false);
        let announcement = fixtures::announcement(&organizer);
        let request = fixtures::registration_request(&announcement, &organizer);
        let permissions = service().record_permissions(None, &request);

        assert_eq!(permissions.len(), 4);
        assert!(permissions.values().all(|allowed| !allowed));
    }

    #[test]
    fn test_missing_policy_yields_empty_map() {
        let service = PermissionsService::new(Arc::new(PolicyRegistry::new(vec![
            &GamePolicy as &'static dyn Policy,
        ])));
        let organizer = fixtures::user(false);
        let announcement = fixtures::announcement(&organizer);
        assert!(service.record_permissions(Some(&organizer), &announcement).is_empty());
    }

    #[test]
    fn test_batch_permissions() {
        let organizer = fixtures::user(false);
        let viewer = fixtures::user(false);
        let own = fixtures::announcement(&viewer);
        let other = fixtures::announcement(&organizer);

        let annotated = service()
            .batch_permissions(Some(&viewer), vec![own.clone(), other.clone()])
            .unwrap();
        assert_eq!(annotated.len(), 2);
        assert_eq!(annotated[0].record.id, own.id);
        assert_eq!(annotated[0].permissions.get("edit"), Some(&true));
        assert_eq!(annotated[1].permissions.get("edit"), Some(&false));

        let empty = service()
            .batch_permissions::<crate::domain::Announcement>(Some(&viewer), vec![])
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_global_permissions() {
        let player = fixtures::user(false);
        let admin = fixtures::user(true);
        let service = service();

        let global = service.global_permissions(Some(&player));
        assert_eq!(global["announcement"].get("create"), Some(&true));
        assert_eq!(global["game"].get("create"), Some(&false));
        assert!(!global.contains_key("registration_request"));

        let global = service.global_permissions(Some(&admin));
        assert_eq!(global["game"].get("create"), Some(&true));

        assert!(service.global_permissions(None).is_empty());
    }
}
