//! Published access state with snapshot reads and serialized writes.

use crate::access::AccessPolicy;
use std::sync::{Arc, Mutex, RwLock};
use warden_core::error::{WardenError, WardenResult};
use warden_core::{AccessState, AccessUri, Decision, PackageState, UserId};

/// Owns an [`AccessPolicy`] and the currently published [`AccessState`].
///
/// Writers are serialized by `write_lock` and build the next version off to
/// the side; readers only hold the `RwLock` long enough to clone the `Arc`.
pub struct AccessService {
    policy: AccessPolicy,
    published: RwLock<Arc<AccessState>>,
    write_lock: Mutex<()>,
}

impl AccessService {
    pub fn new(policy: AccessPolicy) -> Self {
        Self::with_state(policy, AccessState::new())
    }

    pub fn with_state(policy: AccessPolicy, state: AccessState) -> Self {
        Self {
            policy,
            published: RwLock::new(Arc::new(state)),
            write_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// The current published version. Stays valid across later writes.
    pub fn snapshot(&self) -> WardenResult<Arc<AccessState>> {
        let guard = self
            .published
            .read()
            .map_err(|e| WardenError::Internal(format!("Failed to acquire state read lock: {e}")))?;
        Ok(Arc::clone(&guard))
    }

    pub fn get_decision(&self, subject: &AccessUri, object: &AccessUri) -> WardenResult<Decision> {
        let state = self.snapshot()?;
        Ok(self.policy.get_decision(subject, object, &state))
    }

    /// Builds the next version with `f` and publishes it. Returns the new version.
    pub fn mutate<F>(&self, f: F) -> WardenResult<u64>
    where
        F: FnOnce(&AccessPolicy, &AccessState, &mut AccessState),
    {
        let _writer = self.write_lock.lock().map_err(|e| {
            WardenError::Internal(format!("Failed to acquire state write lock: {e}"))
        })?;

        let old_state = self.snapshot()?;
        let mut new_state = old_state.next_version();
        f(&self.policy, &old_state, &mut new_state);
        let version = new_state.version();

        let mut published = self.published.write().map_err(|e| {
            WardenError::Internal(format!("Failed to acquire state write lock: {e}"))
        })?;
        *published = Arc::new(new_state);
        tracing::debug!(version, "published access state");
        Ok(version)
    }

    pub fn add_user(&self, user_id: UserId) -> WardenResult<u64> {
        self.mutate(|policy, old, new| policy.on_user_added(user_id, old, new))
    }

    pub fn remove_user(&self, user_id: UserId) -> WardenResult<u64> {
        self.mutate(|policy, old, new| policy.on_user_removed(user_id, old, new))
    }

    pub fn add_package(&self, package_state: &PackageState) -> WardenResult<u64> {
        self.mutate(|policy, old, new| policy.on_package_added(package_state, old, new))
    }

    pub fn remove_package(&self, package_state: &PackageState) -> WardenResult<u64> {
        self.mutate(|policy, old, new| policy.on_package_removed(package_state, old, new))
    }

    pub fn set_decision(
        &self,
        subject: &AccessUri,
        object: &AccessUri,
        decision: Decision,
    ) -> WardenResult<u64> {
        self.mutate(|policy, old, new| policy.set_decision(subject, object, decision, old, new))
    }
}
