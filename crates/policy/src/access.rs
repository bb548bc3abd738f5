//! Scheme dispatcher and lifecycle fan-out.
//!
//! [`AccessPolicy`] owns no state. It routes decision queries to the
//! [`SchemePolicy`] registered for the `(subject, object)` scheme pair and
//! keeps the user / package / app-id bookkeeping in [`SystemState`] before
//! handing every lifecycle event to each registered policy.
//!
//! [`SystemState`]: warden_core::SystemState

use crate::scheme::SchemePolicy;
use crate::uid_app_op::UidAppOpPolicy;
use crate::uid_permission::UidPermissionPolicy;
use smallvec::SmallVec;
use std::collections::HashMap;
use warden_core::error::{WardenError, WardenResult};
use warden_core::{AccessState, AccessUri, Decision, PackageState, SetMapExt, UserId, UserState};

type SchemeKey = (String, String);

/// Routes access checks by scheme pair and fans out lifecycle events.
///
/// Not synchronized: callers serialize every call, typically by going
/// through [`AccessService`](crate::service::AccessService).
#[derive(Default)]
pub struct AccessPolicy {
    /// Registration order; lifecycle hooks run in this order.
    policies: SmallVec<[Box<dyn SchemePolicy>; 4]>,
    index: HashMap<SchemeKey, usize>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy engine with the built-in uid -> permission and uid -> app-op policies.
    pub fn with_default_policies() -> Self {
        let mut policy = Self::new();
        policy.policies.push(Box::new(UidPermissionPolicy));
        policy.policies.push(Box::new(UidAppOpPolicy));
        policy.rebuild_index();
        policy
    }

    /// Registers `policy` for its scheme pair. A pair can only be claimed once.
    pub fn register(&mut self, policy: Box<dyn SchemePolicy>) -> WardenResult<()> {
        let key = scheme_key(policy.subject_scheme(), policy.object_scheme());
        if self.index.contains_key(&key) {
            return Err(WardenError::DuplicateSchemePolicy {
                subject_scheme: key.0,
                object_scheme: key.1,
            });
        }
        tracing::debug!(subject = %key.0, object = %key.1, "registered scheme policy");
        self.index.insert(key, self.policies.len());
        self.policies.push(policy);
        Ok(())
    }

    /// Registered scheme pairs, in registration order.
    pub fn scheme_pairs(&self) -> Vec<(String, String)> {
        self.policies
            .iter()
            .map(|p| scheme_key(p.subject_scheme(), p.object_scheme()))
            .collect()
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .policies
            .iter()
            .enumerate()
            .map(|(i, p)| (scheme_key(p.subject_scheme(), p.object_scheme()), i))
            .collect();
    }

    fn policy_for(&self, subject: &AccessUri, object: &AccessUri) -> Option<&dyn SchemePolicy> {
        let key = scheme_key(subject.scheme(), object.scheme());
        let policy = self.index.get(&key).map(|&i| self.policies[i].as_ref());
        if policy.is_none() {
            tracing::debug!(
                subject_scheme = %key.0,
                object_scheme = %key.1,
                "no scheme policy registered"
            );
        }
        policy
    }

    // -----------------------------------------------------------------------
    // Decisions
    // -----------------------------------------------------------------------

    /// Unroutable pairs are denied.
    pub fn get_decision(
        &self,
        subject: &AccessUri,
        object: &AccessUri,
        state: &AccessState,
    ) -> Decision {
        match self.policy_for(subject, object) {
            Some(policy) => policy.get_decision(subject, object, state),
            None => Decision::Denied,
        }
    }

    /// Unroutable pairs are ignored.
    pub fn set_decision(
        &self,
        subject: &AccessUri,
        object: &AccessUri,
        decision: Decision,
        old_state: &AccessState,
        new_state: &mut AccessState,
    ) {
        if let Some(policy) = self.policy_for(subject, object) {
            policy.set_decision(subject, object, decision, old_state, new_state);
        }
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Adding a user that already exists resets its state.
    pub fn on_user_added(
        &self,
        user_id: UserId,
        old_state: &AccessState,
        new_state: &mut AccessState,
    ) {
        new_state.system_mut().user_ids.insert(user_id);
        new_state.insert_user(user_id, UserState::default());
        tracing::info!(%user_id, "user added");

        for policy in &self.policies {
            policy.on_user_added(user_id, old_state, new_state);
        }
    }

    pub fn on_user_removed(
        &self,
        user_id: UserId,
        old_state: &AccessState,
        new_state: &mut AccessState,
    ) {
        if !new_state.system().user_ids.contains(&user_id) {
            tracing::warn!(%user_id, "ignoring removal of unknown user");
            return;
        }
        new_state.system_mut().user_ids.remove(&user_id);
        new_state.remove_user(user_id);
        tracing::info!(%user_id, "user removed");

        for policy in &self.policies {
            policy.on_user_removed(user_id, old_state, new_state);
        }
    }

    // -----------------------------------------------------------------------
    // Packages and app-ids
    // -----------------------------------------------------------------------

    /// App-id hooks run before package hooks when the package introduces a
    /// new app-id.
    pub fn on_package_added(
        &self,
        package_state: &PackageState,
        old_state: &AccessState,
        new_state: &mut AccessState,
    ) {
        let name = &package_state.package_name;
        let app_id = package_state.app_id;

        if !app_id.is_valid() {
            tracing::warn!(package = %name, %app_id, "ignoring package with out-of-range app-id");
            return;
        }
        if let Some(existing) = new_state.system().package_states.get(name) {
            if existing.app_id != app_id {
                tracing::warn!(
                    package = %name,
                    %app_id,
                    existing_app_id = %existing.app_id,
                    "ignoring re-add of package under a different app-id"
                );
                return;
            }
        }

        let system = new_state.system_mut();
        system
            .package_states
            .insert(name.clone(), package_state.clone());
        let is_app_id_added = system.app_ids.add_to_set(app_id, name.clone());
        tracing::info!(package = %name, %app_id, is_app_id_added, "package added");

        if is_app_id_added {
            for policy in &self.policies {
                policy.on_app_id_added(app_id, old_state, new_state);
            }
        }
        for policy in &self.policies {
            policy.on_package_added(package_state, old_state, new_state);
        }
    }

    /// Package hooks run before app-id hooks when the package was the last
    /// one holding its app-id.
    pub fn on_package_removed(
        &self,
        package_state: &PackageState,
        old_state: &AccessState,
        new_state: &mut AccessState,
    ) {
        let name = &package_state.package_name;
        let Some(stored) = new_state.system().package_states.get(name).cloned() else {
            tracing::warn!(package = %name, "ignoring removal of unknown package");
            return;
        };
        let app_id = stored.app_id;

        let system = new_state.system_mut();
        system.package_states.remove(name);
        let removal = system.app_ids.remove_from_set(&app_id, name);
        let is_app_id_removed = removal.emptied;
        tracing::info!(package = %name, %app_id, is_app_id_removed, "package removed");

        for policy in &self.policies {
            policy.on_package_removed(&stored, old_state, new_state);
        }
        if is_app_id_removed {
            for policy in &self.policies {
                policy.on_app_id_removed(app_id, old_state, new_state);
            }
        }
    }
}

fn scheme_key(subject: &str, object: &str) -> SchemeKey {
    (subject.to_string(), object.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use warden_core::{scheme, AppId, PackageName, Uid};

    /// Records every hook call as a string.
    struct RecordingPolicy {
        subject: &'static str,
        object: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingPolicy {
        fn new(subject: &'static str, object: &'static str) -> (Self, Arc<Mutex<Vec<String>>>) {
            let log = Arc::new(Mutex::new(Vec::new()));
            let policy = Self {
                subject,
                object,
                log: Arc::clone(&log),
            };
            (policy, log)
        }

        fn record(&self, event: String) {
            self.log.lock().unwrap().push(event);
        }
    }

    impl SchemePolicy for RecordingPolicy {
        fn subject_scheme(&self) -> &str {
            self.subject
        }

        fn object_scheme(&self) -> &str {
            self.object
        }

        fn get_decision(&self, _: &AccessUri, _: &AccessUri, _: &AccessState) -> Decision {
            Decision::Custom(7)
        }

        fn set_decision(
            &self,
            _: &AccessUri,
            _: &AccessUri,
            decision: Decision,
            _: &AccessState,
            _: &mut AccessState,
        ) {
            self.record(format!("set {decision}"));
        }

        fn on_user_added(&self, user_id: UserId, _: &AccessState, new_state: &mut AccessState) {
            assert!(new_state.user(user_id).is_some());
            self.record(format!("user+ {user_id}"));
        }

        fn on_user_removed(&self, user_id: UserId, _: &AccessState, new_state: &mut AccessState) {
            assert!(new_state.user(user_id).is_none());
            self.record(format!("user- {user_id}"));
        }

        fn on_app_id_added(&self, app_id: AppId, _: &AccessState, new_state: &mut AccessState) {
            assert!(new_state.system().app_ids.contains_key(&app_id));
            self.record(format!("appid+ {app_id}"));
        }

        fn on_app_id_removed(&self, app_id: AppId, _: &AccessState, new_state: &mut AccessState) {
            assert!(!new_state.system().app_ids.contains_key(&app_id));
            self.record(format!("appid- {app_id}"));
        }

        fn on_package_added(&self, pkg: &PackageState, _: &AccessState, _: &mut AccessState) {
            self.record(format!("pkg+ {}", pkg.package_name));
        }

        fn on_package_removed(&self, pkg: &PackageState, _: &AccessState, _: &mut AccessState) {
            self.record(format!("pkg- {}", pkg.package_name));
        }
    }

    fn events(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    #[test]
    fn duplicate_scheme_pair_is_rejected() {
        let mut policy = AccessPolicy::with_default_policies();
        let (dup, _) = RecordingPolicy::new(scheme::UID, scheme::PERMISSION);
        let err = policy.register(Box::new(dup)).unwrap_err();
        assert!(matches!(err, WardenError::DuplicateSchemePolicy { .. }));
        assert_eq!(policy.scheme_pairs().len(), 2);
    }

    #[test]
    fn default_policies_in_registration_order() {
        let policy = AccessPolicy::with_default_policies();
        assert_eq!(
            policy.scheme_pairs(),
            vec![
                ("uid".to_string(), "permission".to_string()),
                ("uid".to_string(), "app-op".to_string()),
            ]
        );
    }

    #[test]
    fn unroutable_pair_denies_and_ignores_mutation() {
        let policy = AccessPolicy::with_default_policies();
        let subject = AccessUri::Package(PackageName::from("pkg.a"));
        let object = AccessUri::permission("CAMERA");

        let old = AccessState::new();
        let mut new = old.next_version();
        policy.set_decision(&subject, &object, Decision::Granted, &old, &mut new);

        assert_eq!(policy.get_decision(&subject, &object, &new), Decision::Denied);
        assert!(new.shares_system_with(&old));
        assert_eq!(new.users().count(), 0);
    }

    #[test]
    fn routes_to_registered_policy_verbatim() {
        let mut policy = AccessPolicy::new();
        let (recorder, log) = RecordingPolicy::new("device", "capability");
        policy.register(Box::new(recorder)).unwrap();

        let subject: AccessUri = "device:1".parse().unwrap();
        let object: AccessUri = "capability:usb".parse().unwrap();
        let state = AccessState::new();
        assert_eq!(
            policy.get_decision(&subject, &object, &state),
            Decision::Custom(7)
        );

        let mut new = state.next_version();
        policy.set_decision(&subject, &object, Decision::Granted, &state, &mut new);
        assert_eq!(events(&log), vec!["set GRANTED"]);
    }

    #[test]
    fn app_id_hooks_wrap_package_hooks() {
        let mut policy = AccessPolicy::new();
        let (recorder, log) = RecordingPolicy::new("a", "b");
        policy.register(Box::new(recorder)).unwrap();

        let pkg_a = PackageState::new("pkg.a", AppId(10));
        let pkg_b = PackageState::new("pkg.b", AppId(10));

        let s0 = AccessState::new();
        let mut s1 = s0.next_version();
        policy.on_package_added(&pkg_a, &s0, &mut s1);
        let mut s2 = s1.next_version();
        policy.on_package_added(&pkg_b, &s1, &mut s2);
        assert_eq!(events(&log), vec!["appid+ 10", "pkg+ pkg.a", "pkg+ pkg.b"]);

        let mut s3 = s2.next_version();
        policy.on_package_removed(&pkg_a, &s2, &mut s3);
        let mut s4 = s3.next_version();
        policy.on_package_removed(&pkg_b, &s3, &mut s4);
        assert_eq!(events(&log), vec!["pkg- pkg.a", "pkg- pkg.b", "appid- 10"]);

        assert!(s4.system().app_ids.is_empty());
        s4.validate().unwrap();
    }

    #[test]
    fn hooks_visit_policies_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut policy = AccessPolicy::new();
        for (subject, object) in [("x", "1"), ("x", "2"), ("x", "3")] {
            policy
                .register(Box::new(RecordingPolicy {
                    subject,
                    object,
                    log: Arc::clone(&log),
                }))
                .unwrap();
        }

        let old = AccessState::new();
        let mut new = old.next_version();
        policy.on_user_added(UserId(0), &old, &mut new);
        assert_eq!(events(&log), vec!["user+ 0", "user+ 0", "user+ 0"]);
    }

    #[test]
    fn re_adding_user_resets_state() {
        let policy = AccessPolicy::with_default_policies();
        let s0 = AccessState::new();
        let mut s1 = s0.next_version();
        policy.on_user_added(UserId(0), &s0, &mut s1);

        let uid = AccessUri::Uid(Uid::new(UserId(0), AppId(10_001)).unwrap());
        let camera = AccessUri::permission("CAMERA");
        let mut s2 = s1.next_version();
        policy.set_decision(&uid, &camera, Decision::Granted, &s1, &mut s2);
        assert_eq!(policy.get_decision(&uid, &camera, &s2), Decision::Granted);

        let mut s3 = s2.next_version();
        policy.on_user_added(UserId(0), &s2, &mut s3);
        assert_eq!(policy.get_decision(&uid, &camera, &s3), Decision::Denied);
    }

    #[test]
    fn removing_unknown_entities_is_a_noop() {
        let mut policy = AccessPolicy::new();
        let (recorder, log) = RecordingPolicy::new("a", "b");
        policy.register(Box::new(recorder)).unwrap();

        let old = AccessState::new();
        let mut new = old.next_version();
        policy.on_user_removed(UserId(3), &old, &mut new);
        policy.on_package_removed(&PackageState::new("ghost", AppId(99)), &old, &mut new);

        assert!(events(&log).is_empty());
        assert!(new.shares_system_with(&old));
    }

    #[test]
    fn out_of_range_app_id_is_ignored() {
        let mut policy = AccessPolicy::new();
        let (recorder, log) = RecordingPolicy::new("a", "b");
        policy.register(Box::new(recorder)).unwrap();

        let s0 = AccessState::new();
        let mut s1 = s0.next_version();
        policy.on_package_added(&PackageState::new("pkg.a", AppId(10)), &s0, &mut s1);
        events(&log);

        let mut s2 = s1.next_version();
        policy.on_package_added(&PackageState::new("pkg.far", AppId(100_010)), &s1, &mut s2);
        assert!(events(&log).is_empty());
        assert!(s2.shares_system_with(&s1));
        assert_eq!(s2.system().packages_for(AppId(10)).count(), 1);
    }

    #[test]
    fn re_adding_package_under_other_app_id_is_ignored() {
        let mut policy = AccessPolicy::new();
        let (recorder, log) = RecordingPolicy::new("a", "b");
        policy.register(Box::new(recorder)).unwrap();

        let s0 = AccessState::new();
        let mut s1 = s0.next_version();
        policy.on_package_added(&PackageState::new("pkg.a", AppId(10)), &s0, &mut s1);
        events(&log);

        let mut s2 = s1.next_version();
        policy.on_package_added(&PackageState::new("pkg.a", AppId(11)), &s1, &mut s2);
        assert!(events(&log).is_empty());
        assert_eq!(
            s2.system().package_states[&PackageName::from("pkg.a")].app_id,
            AppId(10)
        );

        // Same app-id: replaces state without a new app-id event.
        let mut s3 = s2.next_version();
        policy.on_package_added(&PackageState::new("pkg.a", AppId(10)), &s2, &mut s3);
        assert_eq!(events(&log), vec!["pkg+ pkg.a"]);
        s3.validate().unwrap();
    }
}
