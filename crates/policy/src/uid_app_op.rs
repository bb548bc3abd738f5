//! `uid` -> `app-op` modes.

use crate::scheme::SchemePolicy;
use warden_core::{scheme, AccessState, AccessUri, AppId, Decision, Uid};

/// Mode reported for an op nobody has set. Scheme-specific code.
pub const APP_OP_MODE_DEFAULT: i32 = 3;
/// Allowed only while the app is in the foreground. Scheme-specific code.
pub const APP_OP_MODE_FOREGROUND: i32 = 4;

/// App-op modes keyed by `UserState::uid_app_op_modes[app_id][op]`.
///
/// Only non-default modes are stored.
pub struct UidAppOpPolicy;

impl UidAppOpPolicy {
    pub fn default_mode() -> Decision {
        Decision::Custom(APP_OP_MODE_DEFAULT)
    }

    fn split<'a>(subject: &AccessUri, object: &'a AccessUri) -> Option<(Uid, &'a str)> {
        match (subject, object) {
            (AccessUri::Uid(uid), AccessUri::AppOp(op)) => Some((*uid, op.as_str())),
            _ => None,
        }
    }
}

impl SchemePolicy for UidAppOpPolicy {
    fn subject_scheme(&self) -> &str {
        scheme::UID
    }

    fn object_scheme(&self) -> &str {
        scheme::APP_OP
    }

    fn get_decision(
        &self,
        subject: &AccessUri,
        object: &AccessUri,
        state: &AccessState,
    ) -> Decision {
        let Some((uid, op)) = Self::split(subject, object) else {
            return Decision::Denied;
        };
        state
            .user(uid.user_id())
            .and_then(|user| user.uid_app_op_modes.get(&uid.app_id()))
            .and_then(|modes| modes.get(op))
            .copied()
            .unwrap_or_else(Self::default_mode)
    }

    fn set_decision(
        &self,
        subject: &AccessUri,
        object: &AccessUri,
        decision: Decision,
        _old_state: &AccessState,
        new_state: &mut AccessState,
    ) {
        let Some((uid, op)) = Self::split(subject, object) else {
            return;
        };
        let Some(user) = new_state.user_mut(uid.user_id()) else {
            tracing::debug!(%uid, op, "no such user, dropping app-op mode");
            return;
        };

        let app_id = uid.app_id();
        if decision == Self::default_mode() {
            if let Some(modes) = user.uid_app_op_modes.get_mut(&app_id) {
                modes.remove(op);
                if modes.is_empty() {
                    user.uid_app_op_modes.remove(&app_id);
                }
            }
        } else {
            user.uid_app_op_modes
                .entry(app_id)
                .or_default()
                .insert(op.to_string(), decision);
        }
        tracing::debug!(%uid, op, mode = decision.code(), "app-op mode set");
    }

    fn on_app_id_removed(
        &self,
        app_id: AppId,
        _old_state: &AccessState,
        new_state: &mut AccessState,
    ) {
        for (_, user) in new_state.users_mut() {
            user.uid_app_op_modes.remove(&app_id);
        }
    }
}
