//! Domain types for the Warden access policy engine.

use crate::error::{WardenError, WardenResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Number of UIDs reserved for each user.
pub const PER_USER_RANGE: u32 = 100_000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u32);

/// Identifier shared by every package that runs under the same UID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AppId(pub u32);

/// A kernel UID: `user_id * PER_USER_RANGE + app_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub u32);

impl AppId {
    /// An app-id is encodable in a [`Uid`] only below `PER_USER_RANGE`.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 < PER_USER_RANGE
    }
}

impl Uid {
    /// `None` when `app_id` is out of range or the UID would overflow `u32`.
    pub fn new(user_id: UserId, app_id: AppId) -> Option<Self> {
        if !app_id.is_valid() {
            return None;
        }
        user_id
            .0
            .checked_mul(PER_USER_RANGE)?
            .checked_add(app_id.0)
            .map(Self)
    }

    #[inline]
    pub fn user_id(self) -> UserId {
        UserId(self.0 / PER_USER_RANGE)
    }

    #[inline]
    pub fn app_id(self) -> AppId {
        AppId(self.0 % PER_USER_RANGE)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(pub String);

impl PackageName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for PackageName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Package
// ---------------------------------------------------------------------------

/// Read-only view of an installed package, owned by the package manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageState {
    pub package_name: PackageName,
    pub app_id: AppId,
    #[serde(default)]
    pub requested_permissions: Vec<String>,
}

impl PackageState {
    pub fn new(package_name: impl Into<PackageName>, app_id: AppId) -> Self {
        Self {
            package_name: package_name.into(),
            app_id,
            requested_permissions: Vec::new(),
        }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }
}

// ---------------------------------------------------------------------------
// Access URIs
// ---------------------------------------------------------------------------

pub mod scheme {
    pub const UID: &str = "uid";
    pub const PERMISSION: &str = "permission";
    pub const APP_OP: &str = "app-op";
    pub const PACKAGE: &str = "package";
}

/// Subject or object of an access check: a scheme plus scheme-specific fields.
///
/// Text form is `scheme:value`, e.g. `uid:1010042` or
/// `permission:android.permission.CAMERA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessUri {
    Uid(Uid),
    Permission(String),
    AppOp(String),
    Package(PackageName),
    /// A scheme this crate does not model; routed purely by its tag.
    Opaque { scheme: String, value: String },
}

impl AccessUri {
    pub fn scheme(&self) -> &str {
        match self {
            AccessUri::Uid(_) => scheme::UID,
            AccessUri::Permission(_) => scheme::PERMISSION,
            AccessUri::AppOp(_) => scheme::APP_OP,
            AccessUri::Package(_) => scheme::PACKAGE,
            AccessUri::Opaque { scheme, .. } => scheme,
        }
    }

    pub fn permission(name: impl Into<String>) -> Self {
        AccessUri::Permission(name.into())
    }

    pub fn app_op(name: impl Into<String>) -> Self {
        AccessUri::AppOp(name.into())
    }
}

impl FromStr for AccessUri {
    type Err = WardenError;

    fn from_str(s: &str) -> WardenResult<Self> {
        let (scheme, value) = s
            .split_once(':')
            .ok_or_else(|| WardenError::InvalidUri(format!("`{s}` (expected \"scheme:value\")")))?;
        if scheme.is_empty() || value.is_empty() {
            return Err(WardenError::InvalidUri(format!(
                "`{s}` (scheme and value must not be empty)"
            )));
        }

        let uri = match scheme {
            scheme::UID => {
                let raw = value
                    .parse::<u32>()
                    .map_err(|e| WardenError::InvalidUri(format!("`{s}`: bad uid: {e}")))?;
                AccessUri::Uid(Uid(raw))
            }
            scheme::PERMISSION => AccessUri::Permission(value.to_string()),
            scheme::APP_OP => AccessUri::AppOp(value.to_string()),
            scheme::PACKAGE => AccessUri::Package(PackageName::from(value)),
            other => AccessUri::Opaque {
                scheme: other.to_string(),
                value: value.to_string(),
            },
        };
        Ok(uri)
    }
}

impl fmt::Display for AccessUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessUri::Uid(uid) => write!(f, "{}:{}", scheme::UID, uid),
            AccessUri::Permission(name) => write!(f, "{}:{}", scheme::PERMISSION, name),
            AccessUri::AppOp(name) => write!(f, "{}:{}", scheme::APP_OP, name),
            AccessUri::Package(name) => write!(f, "{}:{}", scheme::PACKAGE, name),
            AccessUri::Opaque { scheme, value } => write!(f, "{scheme}:{value}"),
        }
    }
}

impl Serialize for AccessUri {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccessUri {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Outcome of an access check.
///
/// Codes `0` and `1` are shared by every scheme. Anything else is
/// scheme-specific and must not be compared across schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Decision {
    #[default]
    Denied,
    Granted,
    Custom(i32),
}

impl Decision {
    pub const DENIED_CODE: i32 = 0;
    pub const GRANTED_CODE: i32 = 1;

    pub fn from_code(code: i32) -> Self {
        match code {
            Self::DENIED_CODE => Decision::Denied,
            Self::GRANTED_CODE => Decision::Granted,
            other => Decision::Custom(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Decision::Denied => Self::DENIED_CODE,
            Decision::Granted => Self::GRANTED_CODE,
            Decision::Custom(code) => code,
        }
    }

    pub fn is_granted(self) -> bool {
        self == Decision::Granted
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Denied => f.write_str("DENIED"),
            Decision::Granted => f.write_str("GRANTED"),
            Decision::Custom(code) => write!(f, "CUSTOM({code})"),
        }
    }
}

impl Serialize for Decision {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i32::deserialize(deserializer).map(Decision::from_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_splits_into_user_and_app_id() {
        let uid = Uid::new(UserId(10), AppId(10_042)).unwrap();
        assert_eq!(uid.0, 1_010_042);
        assert_eq!(uid.user_id(), UserId(10));
        assert_eq!(uid.app_id(), AppId(10_042));
    }

    #[test]
    fn uid_rejects_out_of_range_parts() {
        assert_eq!(Uid::new(UserId(0), AppId(PER_USER_RANGE)), None);
        assert_eq!(Uid::new(UserId(0), AppId(100_010)), None);
        assert_eq!(Uid::new(UserId(50_000), AppId(1)), None);
        assert_eq!(Uid::new(UserId(42_949), AppId(67_295)), Some(Uid(u32::MAX)));
        assert_eq!(Uid::new(UserId(42_949), AppId(67_296)), None);
        assert!(AppId(99_999).is_valid());
        assert!(!AppId(100_000).is_valid());
    }

    #[test]
    fn parse_known_schemes() {
        let uri: AccessUri = "uid:1010042".parse().unwrap();
        assert_eq!(uri, AccessUri::Uid(Uid(1_010_042)));
        assert_eq!(uri.scheme(), scheme::UID);

        let uri: AccessUri = "permission:android.permission.CAMERA".parse().unwrap();
        assert_eq!(uri, AccessUri::permission("android.permission.CAMERA"));
        assert_eq!(uri.to_string(), "permission:android.permission.CAMERA");

        let uri: AccessUri = "app-op:android:camera".parse().unwrap();
        assert_eq!(uri, AccessUri::app_op("android:camera"));
    }

    #[test]
    fn parse_unknown_scheme_is_opaque() {
        let uri: AccessUri = "device:42".parse().unwrap();
        assert_eq!(uri.scheme(), "device");
        assert_eq!(uri.to_string(), "device:42");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("noscheme".parse::<AccessUri>().is_err());
        assert!(":value".parse::<AccessUri>().is_err());
        assert!("uid:".parse::<AccessUri>().is_err());
        assert!("uid:abc".parse::<AccessUri>().is_err());
    }

    #[test]
    fn decision_codes() {
        assert_eq!(Decision::from_code(0), Decision::Denied);
        assert_eq!(Decision::from_code(1), Decision::Granted);
        assert_eq!(Decision::from_code(4), Decision::Custom(4));
        assert_eq!(Decision::Custom(4).code(), 4);
        assert_eq!(Decision::default(), Decision::Denied);
    }

    #[test]
    fn decision_and_uri_serialize_as_wire_values() {
        let json = serde_json::to_string(&Decision::Granted).unwrap();
        assert_eq!(json, "1");
        let json = serde_json::to_string(&AccessUri::Uid(Uid(10_001))).unwrap();
        assert_eq!(json, "\"uid:10001\"");
        let uri: AccessUri = serde_json::from_str("\"package:pkg.a\"").unwrap();
        assert_eq!(uri, AccessUri::Package(PackageName::from("pkg.a")));
    }
}
