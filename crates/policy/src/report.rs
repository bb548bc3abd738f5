//! Human-readable and JSON summaries of an access state.

use serde::Serialize;
use warden_core::{AccessState, AppId, Decision, UserId};

/// Summary produced from one [`AccessState`] version.
#[derive(Debug, Serialize)]
pub struct StateReport {
    pub version: u64,
    pub user_count: usize,
    pub package_count: usize,
    pub app_id_count: usize,
    /// App-ids held by more than one package, ordered by app-id.
    pub shared_app_ids: Vec<SharedAppId>,
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct SharedAppId {
    pub app_id: AppId,
    pub packages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub user_id: UserId,
    pub granted_permissions: usize,
    /// Stored permission decisions other than a plain grant.
    pub custom_permission_decisions: usize,
    pub app_op_overrides: usize,
}

impl StateReport {
    pub fn build(state: &AccessState) -> Self {
        let system = state.system();

        let shared_app_ids = system
            .app_ids
            .iter()
            .filter(|(_, names)| names.len() > 1)
            .map(|(app_id, names)| SharedAppId {
                app_id: *app_id,
                packages: names.iter().map(|n| n.to_string()).collect(),
            })
            .collect();

        let users = state
            .users()
            .map(|(user_id, user)| {
                let decisions = || user.uid_permissions.values().flat_map(|p| p.values());
                UserSummary {
                    user_id,
                    granted_permissions: decisions().filter(|d| **d == Decision::Granted).count(),
                    custom_permission_decisions: decisions()
                        .filter(|d| matches!(d, Decision::Custom(_)))
                        .count(),
                    app_op_overrides: user.uid_app_op_modes.values().map(|m| m.len()).sum(),
                }
            })
            .collect();

        StateReport {
            version: state.version(),
            user_count: system.user_ids.len(),
            package_count: system.package_states.len(),
            app_id_count: system.app_ids.len(),
            shared_app_ids,
            users,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push('\n');
        out.push_str("╔══════════════════════════════════════════════════════════════╗\n");
        out.push_str("║                     WARDEN ACCESS STATE                     ║\n");
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        out.push_str(&format!("║  Version:            {:>38} ║\n", self.version));
        out.push_str(&format!("║  Users:              {:>38} ║\n", self.user_count));
        out.push_str(&format!("║  Packages:           {:>38} ║\n", self.package_count));
        out.push_str(&format!("║  App-ids:            {:>38} ║\n", self.app_id_count));
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        if self.shared_app_ids.is_empty() {
            out.push_str("║  No shared app-ids.                                         ║\n");
        } else {
            out.push_str("║  SHARED APP-IDS                                             ║\n");
            for shared in &self.shared_app_ids {
                out.push_str(&format!(
                    "║     {} -> {}\n",
                    shared.app_id,
                    shared.packages.join(", ")
                ));
            }
        }

        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        for user in &self.users {
            out.push_str(&format!(
                "║  User {}: {} granted  |  {} custom  |  {} app-op overrides\n",
                user.user_id,
                user.granted_permissions,
                user.custom_permission_decisions,
                user.app_op_overrides
            ));
        }

        out.push_str("╚══════════════════════════════════════════════════════════════╝\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessPolicy;
    use warden_core::{AccessUri, PackageState, Uid};

    fn sample_state() -> AccessState {
        let policy = AccessPolicy::with_default_policies();
        let s0 = AccessState::new();
        let mut s1 = s0.next_version();
        policy.on_user_added(UserId(0), &s0, &mut s1);
        policy.on_package_added(&PackageState::new("pkg.a", AppId(10)), &s0, &mut s1);
        policy.on_package_added(&PackageState::new("pkg.b", AppId(10)), &s0, &mut s1);
        policy.on_package_added(&PackageState::new("pkg.c", AppId(11)), &s0, &mut s1);

        let uid = AccessUri::Uid(Uid::new(UserId(0), AppId(10)).unwrap());
        policy.set_decision(
            &uid,
            &AccessUri::permission("CAMERA"),
            Decision::Granted,
            &s0,
            &mut s1,
        );
        policy.set_decision(&uid, &AccessUri::permission("MIC"), Decision::Custom(5), &s0, &mut s1);
        policy.set_decision(&uid, &AccessUri::app_op("op"), Decision::Granted, &s0, &mut s1);
        s1
    }

    #[test]
    fn counts_match_state() {
        let report = StateReport::build(&sample_state());
        assert_eq!(report.version, 1);
        assert_eq!(report.user_count, 1);
        assert_eq!(report.package_count, 3);
        assert_eq!(report.app_id_count, 2);
        assert_eq!(report.shared_app_ids.len(), 1);
        assert_eq!(report.shared_app_ids[0].packages, vec!["pkg.a", "pkg.b"]);

        let user = &report.users[0];
        assert_eq!(user.granted_permissions, 1);
        assert_eq!(user.custom_permission_decisions, 1);
        assert_eq!(user.app_op_overrides, 1);
    }

    #[test]
    fn render_and_json() {
        let report = StateReport::build(&sample_state());
        let text = report.render();
        assert!(text.contains("WARDEN ACCESS STATE"));
        assert!(text.contains("pkg.a, pkg.b"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["app_id_count"], 2);
        assert_eq!(json["shared_app_ids"][0]["app_id"], 10);
    }

    #[test]
    fn empty_state_has_no_shared_app_ids() {
        let report = StateReport::build(&AccessState::new());
        assert!(report.render().contains("No shared app-ids."));
        assert!(report.users.is_empty());
    }
}
