//! Safety data snapshots and per-user change-listener fan-out.

pub mod callback;
pub mod data;
pub mod listeners;
pub mod sink;

pub use callback::{Broadcast, CallbackList, RemoteCallback};
pub use data::{SafetyCenterData, SafetyCenterStatus, SeverityLevel};
pub use listeners::{DataChangedListener, ListenerGroup, SafetyCenterListeners};
pub use sink::json_stream::JsonStreamListener;
