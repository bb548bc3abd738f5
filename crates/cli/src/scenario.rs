//! Scenario files: a JSON array of tagged lifecycle, decision and listener
//! events, replayed in order.
//!
//! ```json
//! [
//!   { "event": "add_user", "user_id": 0 },
//!   { "event": "add_package", "package_name": "pkg.a", "app_id": 10,
//!     "requested_permissions": ["android.permission.CAMERA"] },
//!   { "event": "set_decision", "subject": "uid:10",
//!     "object": "permission:android.permission.CAMERA", "decision": 1 },
//!   { "event": "check", "subject": "uid:10",
//!     "object": "permission:android.permission.CAMERA", "expect": 1 }
//! ]
//! ```

use serde::Deserialize;
use std::path::Path;
use warden_core::error::{WardenError, WardenResult};
use warden_core::{AccessUri, Decision, PackageName, PackageState, UserId};
use warden_safety::SafetyCenterData;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    AddUser {
        user_id: UserId,
    },
    RemoveUser {
        user_id: UserId,
    },
    AddPackage(PackageState),
    /// Looked up by name in the current state; unknown packages are skipped.
    RemovePackage {
        package_name: PackageName,
    },
    SetDecision {
        subject: AccessUri,
        object: AccessUri,
        decision: Decision,
    },
    Check {
        subject: AccessUri,
        object: AccessUri,
        #[serde(default)]
        expect: Option<Decision>,
    },
    Subscribe {
        listener: String,
        user_id: UserId,
    },
    Unsubscribe {
        listener: String,
        user_id: UserId,
    },
    Publish {
        user_id: UserId,
        data: SafetyCenterData,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::AddUser { .. } => "add_user",
            Event::RemoveUser { .. } => "remove_user",
            Event::AddPackage(_) => "add_package",
            Event::RemovePackage { .. } => "remove_package",
            Event::SetDecision { .. } => "set_decision",
            Event::Check { .. } => "check",
            Event::Subscribe { .. } => "subscribe",
            Event::Unsubscribe { .. } => "unsubscribe",
            Event::Publish { .. } => "publish",
        }
    }
}

pub fn parse(json: &str) -> WardenResult<Vec<Event>> {
    serde_json::from_str(json)
        .map_err(|e| WardenError::InvalidInput(format!("malformed scenario: {e}")))
}

pub fn load(path: &Path) -> WardenResult<Vec<Event>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        WardenError::InvalidInput(format!("cannot read scenario {}: {e}", path.display()))
    })?;
    parse(&raw)
}
