//! Identifiers, access URIs, decisions, versioned state, and error definitions.
//!
//! Foundation crate -- no I/O dependencies.

pub mod collection;
pub mod error;
pub mod state;
pub mod types;

pub use collection::{SetMapExt, SetRemoval};
pub use error::{WardenError, WardenResult};
pub use state::{AccessState, SystemState, UserState};
pub use types::{
    scheme, AccessUri, AppId, Decision, PackageName, PackageState, Uid, UserId, PER_USER_RANGE,
};
