//! `uid` -> `permission` decisions, stored per user and app-id.

use crate::scheme::SchemePolicy;
use warden_core::{scheme, AccessState, AccessUri, AppId, Decision, Uid};

/// Permission grants keyed by `UserState::uid_permissions[app_id][permission]`.
///
/// Storage is sparse: `Denied` is never stored.
pub struct UidPermissionPolicy;

impl UidPermissionPolicy {
    fn split<'a>(subject: &AccessUri, object: &'a AccessUri) -> Option<(Uid, &'a str)> {
        match (subject, object) {
            (AccessUri::Uid(uid), AccessUri::Permission(name)) => Some((*uid, name.as_str())),
            _ => None,
        }
    }
}

impl SchemePolicy for UidPermissionPolicy {
    fn subject_scheme(&self) -> &str {
        scheme::UID
    }

    fn object_scheme(&self) -> &str {
        scheme::PERMISSION
    }

    fn get_decision(
        &self,
        subject: &AccessUri,
        object: &AccessUri,
        state: &AccessState,
    ) -> Decision {
        let Some((uid, permission)) = Self::split(subject, object) else {
            return Decision::Denied;
        };
        state
            .user(uid.user_id())
            .and_then(|user| user.uid_permissions.get(&uid.app_id()))
            .and_then(|permissions| permissions.get(permission))
            .copied()
            .unwrap_or(Decision::Denied)
    }

    fn set_decision(
        &self,
        subject: &AccessUri,
        object: &AccessUri,
        decision: Decision,
        _old_state: &AccessState,
        new_state: &mut AccessState,
    ) {
        let Some((uid, permission)) = Self::split(subject, object) else {
            return;
        };
        let Some(user) = new_state.user_mut(uid.user_id()) else {
            tracing::debug!(%uid, permission, "no such user, dropping permission decision");
            return;
        };

        let app_id = uid.app_id();
        if decision == Decision::Denied {
            if let Some(permissions) = user.uid_permissions.get_mut(&app_id) {
                permissions.remove(permission);
                if permissions.is_empty() {
                    user.uid_permissions.remove(&app_id);
                }
            }
        } else {
            user.uid_permissions
                .entry(app_id)
                .or_default()
                .insert(permission.to_string(), decision);
        }
        tracing::debug!(%uid, permission, %decision, "permission decision set");
    }

    fn on_app_id_removed(
        &self,
        app_id: AppId,
        _old_state: &AccessState,
        new_state: &mut AccessState,
    ) {
        for (_, user) in new_state.users_mut() {
            user.uid_permissions.remove(&app_id);
        }
    }
}
