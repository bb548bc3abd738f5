//! Access policy engine: scheme dispatch, built-in scheme policies,
//! double-buffered state service, and state reports.

pub mod access;
pub mod report;
pub mod scheme;
pub mod service;
pub mod uid_app_op;
pub mod uid_permission;

pub use access::AccessPolicy;
pub use scheme::SchemePolicy;
pub use service::AccessService;
pub use uid_app_op::UidAppOpPolicy;
pub use uid_permission::UidPermissionPolicy;
