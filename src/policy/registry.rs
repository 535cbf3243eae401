use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{AppError, Result};

use super::{
    Action, AnnouncementPolicy, Authorizable, EntityKind, GamePolicy, Policy,
    RegistrationRequestPolicy,
};

/// Entity name → policy.
pub type PolicyTable = BTreeMap<&'static str, &'static dyn Policy>;

/// Action → whether it is global.
pub type MethodTable = BTreeMap<Action, bool>;

/// Resolves the policy for a record and caches each policy's action inventory.
///
/// Policies are registered once at construction. The entity → policy table
/// and the per-policy method tables are built lazily on first use and then
/// shared read-only; concurrent first calls build them exactly once.
pub struct PolicyRegistry {
    registered: Vec<&'static dyn Policy>,
    policies: RwLock<Option<Arc<PolicyTable>>>,
    methods: RwLock<HashMap<&'static str, Arc<MethodTable>>>,
    builds: AtomicUsize,
}

impl PolicyRegistry {
    pub fn new(registered: Vec<&'static dyn Policy>) -> Self {
        Self {
            registered,
            policies: RwLock::new(None),
            methods: RwLock::new(HashMap::new()),
            builds: AtomicUsize::new(0),
        }
    }

    /// Policy for a concrete record.
    pub fn policy_for<R: Authorizable + ?Sized>(&self, _record: &R) -> Result<&'static dyn Policy> {
        self.policy_for_kind(R::KIND)
    }

    /// Policy named `<Entity>Policy` for the given entity kind.
    pub fn policy_for_kind(&self, kind: EntityKind) -> Result<&'static dyn Policy> {
        self.all_policies()
            .get(kind.name())
            .copied()
            .ok_or(AppError::PolicyNotFound { entity: kind.name() })
    }

    /// `{action: is_global}` for a policy, computed once per policy.
    pub fn permission_methods(&self, policy: &dyn Policy) -> Arc<MethodTable> {
        if let Some(table) = read(&self.methods).get(policy.name()) {
            return table.clone();
        }

        let mut methods = write(&self.methods);
        methods
            .entry(policy.name())
            .or_insert_with(|| {
                Arc::new(
                    policy
                        .rules()
                        .iter()
                        .map(|rule| (rule.action, rule.action.is_global()))
                        .collect(),
                )
            })
            .clone()
    }

    /// Every registered policy keyed by entity name.
    pub fn all_policies(&self) -> Arc<PolicyTable> {
        if let Some(table) = read(&self.policies).as_ref() {
            return table.clone();
        }

        let mut slot = write(&self.policies);
        if let Some(table) = slot.as_ref() {
            return table.clone();
        }

        let mut table = PolicyTable::new();
        for policy in &self.registered {
            let entity = policy.entity().name();
            if policy.name() != format!("{entity}Policy") {
                tracing::warn!(
                    "Skipping policy '{}': name does not match entity '{}'",
                    policy.name(),
                    entity
                );
                continue;
            }
            table.insert(entity, *policy);
        }

        self.builds.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Discovered {} policy classes", table.len());

        let table = Arc::new(table);
        *slot = Some(table.clone());
        table
    }

    /// How many times the policy table has been built since the last clear.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Drops every cached table. Only needed to isolate tests.
    pub fn clear_cache(&self) {
        *write(&self.policies) = None;
        write(&self.methods).clear();
        self.builds.store(0, Ordering::SeqCst);
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new(vec![
            &AnnouncementPolicy as &'static dyn Policy,
            &GamePolicy,
            &RegistrationRequestPolicy,
        ])
    }
}

// A panic while holding the lock cannot leave the tables half-written, so a
// poisoned lock is still safe to use.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
