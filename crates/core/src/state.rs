//! Versioned access state.
//!
//! An [`AccessState`] is never edited in place by the engine. Every mutation
//! starts from [`AccessState::next_version`], which shares all storage with
//! the previous version through `Arc`; the `*_mut` accessors copy on write
//! only the parts they touch. Readers can keep the old version for as long as
//! they like.

use crate::collection::SetMapExt;
use crate::error::{WardenError, WardenResult};
use crate::types::{AppId, Decision, PackageName, PackageState, UserId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// System / user state
// ---------------------------------------------------------------------------

/// Process-wide state, not partitioned by user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemState {
    pub user_ids: BTreeSet<UserId>,
    pub package_states: BTreeMap<PackageName, PackageState>,
    /// Non-empty by construction: an app-id is present iff a package maps to it.
    pub app_ids: BTreeMap<AppId, BTreeSet<PackageName>>,
}

impl SystemState {
    pub fn packages_for(&self, app_id: AppId) -> impl Iterator<Item = &PackageState> {
        self.app_ids
            .get(&app_id)
            .into_iter()
            .flatten()
            .filter_map(|name| self.package_states.get(name))
    }

    pub fn is_shared_app_id(&self, app_id: AppId) -> bool {
        self.app_ids.get(&app_id).is_some_and(|names| names.len() > 1)
    }
}

/// Decision storage for one user. Each field belongs to one scheme policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserState {
    pub uid_permissions: BTreeMap<AppId, BTreeMap<String, Decision>>,
    pub uid_app_op_modes: BTreeMap<AppId, BTreeMap<String, Decision>>,
}

// ---------------------------------------------------------------------------
// AccessState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct AccessState {
    version: u64,
    system: Arc<SystemState>,
    users: BTreeMap<UserId, Arc<UserState>>,
}

impl AccessState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Starts the next version. Storage is shared until written.
    pub fn next_version(&self) -> Self {
        Self {
            version: self.version + 1,
            system: Arc::clone(&self.system),
            users: self.users.clone(),
        }
    }

    pub fn system(&self) -> &SystemState {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut SystemState {
        Arc::make_mut(&mut self.system)
    }

    pub fn user(&self, user_id: UserId) -> Option<&UserState> {
        self.users.get(&user_id).map(Arc::as_ref)
    }

    pub fn user_mut(&mut self, user_id: UserId) -> Option<&mut UserState> {
        self.users.get_mut(&user_id).map(Arc::make_mut)
    }

    pub fn users(&self) -> impl Iterator<Item = (UserId, &UserState)> {
        self.users.iter().map(|(id, state)| (*id, state.as_ref()))
    }

    pub fn users_mut(&mut self) -> impl Iterator<Item = (UserId, &mut UserState)> {
        self.users
            .iter_mut()
            .map(|(id, state)| (*id, Arc::make_mut(state)))
    }

    /// Installs `state` for `user_id`, replacing any previous one.
    pub fn insert_user(&mut self, user_id: UserId, state: UserState) {
        self.users.insert(user_id, Arc::new(state));
    }

    pub fn remove_user(&mut self, user_id: UserId) -> bool {
        self.users.remove(&user_id).is_some()
    }

    /// True when `other` still points at the same system storage.
    pub fn shares_system_with(&self, other: &AccessState) -> bool {
        Arc::ptr_eq(&self.system, &other.system)
    }

    /// True when both states point at the same storage for `user_id`.
    pub fn shares_user_with(&self, other: &AccessState, user_id: UserId) -> bool {
        match (self.users.get(&user_id), other.users.get(&user_id)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Checks the package / app-id / user bookkeeping invariants.
    pub fn validate(&self) -> WardenResult<()> {
        let system = self.system();

        for (app_id, names) in &system.app_ids {
            if names.is_empty() {
                return Err(WardenError::InvariantViolation(format!(
                    "app-id {app_id} has no packages"
                )));
            }
            for name in names {
                match system.package_states.get(name) {
                    Some(pkg) if pkg.app_id == *app_id => {}
                    Some(pkg) => {
                        return Err(WardenError::InvariantViolation(format!(
                            "package {name} listed under app-id {app_id} but owns app-id {}",
                            pkg.app_id
                        )))
                    }
                    None => {
                        return Err(WardenError::InvariantViolation(format!(
                            "app-id {app_id} lists unknown package {name}"
                        )))
                    }
                }
            }
        }

        for (name, pkg) in &system.package_states {
            if !system.app_ids.set_contains(&pkg.app_id, name) {
                return Err(WardenError::InvariantViolation(format!(
                    "package {name} missing from app-id {}",
                    pkg.app_id
                )));
            }
        }

        let user_keys: BTreeSet<UserId> = self.users.keys().copied().collect();
        if user_keys != system.user_ids {
            return Err(WardenError::InvariantViolation(format!(
                "user ids {:?} do not match user states {:?}",
                system.user_ids, user_keys
            )));
        }

        Ok(())
    }
}
