//! The capability every scheme policy implements.

use warden_core::{AccessState, AccessUri, AppId, Decision, PackageState, UserId};

/// Decision lookup, mutation, and lifecycle hooks for one
/// `(subject_scheme, object_scheme)` pair.
///
/// Policies hold no state of their own. Everything they read or write lives
/// in [`AccessState`]. Mutators receive the previous version as `old_state`
/// and may only write to `new_state`.
pub trait SchemePolicy: Send + Sync {
    fn subject_scheme(&self) -> &str;

    fn object_scheme(&self) -> &str;

    fn get_decision(&self, subject: &AccessUri, object: &AccessUri, state: &AccessState)
        -> Decision;

    fn set_decision(
        &self,
        subject: &AccessUri,
        object: &AccessUri,
        decision: Decision,
        old_state: &AccessState,
        new_state: &mut AccessState,
    );

    fn on_user_added(
        &self,
        _user_id: UserId,
        _old_state: &AccessState,
        _new_state: &mut AccessState,
    ) {
    }

    fn on_user_removed(
        &self,
        _user_id: UserId,
        _old_state: &AccessState,
        _new_state: &mut AccessState,
    ) {
    }

    fn on_app_id_added(
        &self,
        _app_id: AppId,
        _old_state: &AccessState,
        _new_state: &mut AccessState,
    ) {
    }

    fn on_app_id_removed(
        &self,
        _app_id: AppId,
        _old_state: &AccessState,
        _new_state: &mut AccessState,
    ) {
    }

    fn on_package_added(
        &self,
        _package_state: &PackageState,
        _old_state: &AccessState,
        _new_state: &mut AccessState,
    ) {
    }

    fn on_package_removed(
        &self,
        _package_state: &PackageState,
        _old_state: &AccessState,
        _new_state: &mut AccessState,
    ) {
    }
}
