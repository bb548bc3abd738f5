//! Drives an [`AccessService`] and a [`SafetyCenterListeners`] registry
//! through a scenario.

use crate::scenario::Event;
use std::collections::BTreeMap;
use std::fs::File;
use std::sync::Arc;
use warden_core::error::{WardenError, WardenResult};
use warden_core::UserId;
use warden_policy::{AccessPolicy, AccessService};
use warden_safety::{
    DataChangedListener, JsonStreamListener, RemoteCallback, SafetyCenterData,
    SafetyCenterListeners,
};

/// Where subscribed listeners send the snapshots they receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkSpec {
    Log,
    NdjsonStdout,
    NdjsonFile(String),
}

impl SinkSpec {
    /// Parses `ndjson` or `ndjson:/path/to/file`. `None` means log-only.
    pub fn parse(spec: Option<&str>) -> WardenResult<Self> {
        match spec {
            None => Ok(SinkSpec::Log),
            Some("ndjson") => Ok(SinkSpec::NdjsonStdout),
            Some(s) => match s.strip_prefix("ndjson:") {
                Some(path) if !path.is_empty() => Ok(SinkSpec::NdjsonFile(path.to_string())),
                _ => Err(WardenError::InvalidInput(format!(
                    "unknown sink: {s}. Use 'ndjson' or 'ndjson:/path'"
                ))),
            },
        }
    }
}

/// Listener that only logs what it receives.
struct LogListener {
    name: String,
}

impl RemoteCallback for LogListener {}

impl DataChangedListener for LogListener {
    fn on_data_changed(&self, data: &SafetyCenterData) -> WardenResult<()> {
        tracing::info!(
            listener = %self.name,
            title = %data.status.title,
            severity = ?data.highest_severity(),
            issues = data.issues.len(),
            "safety data changed"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub events: usize,
    pub checks: usize,
    pub subscriptions: usize,
    pub deliveries: usize,
}

pub struct Replay {
    service: AccessService,
    listeners: SafetyCenterListeners,
    /// Listener instances by name, so unsubscribe finds the same allocation.
    named: BTreeMap<String, Arc<dyn DataChangedListener>>,
    sink: SinkSpec,
    file: Option<File>,
    stats: ReplayStats,
}

impl Replay {
    pub fn new(sink: SinkSpec) -> WardenResult<Self> {
        let file = match &sink {
            SinkSpec::NdjsonFile(path) => Some(File::create(path).map_err(|e| {
                WardenError::InvalidInput(format!("cannot create sink file {path}: {e}"))
            })?),
            _ => None,
        };
        Ok(Self {
            service: AccessService::new(AccessPolicy::with_default_policies()),
            listeners: SafetyCenterListeners::new(),
            named: BTreeMap::new(),
            sink,
            file,
            stats: ReplayStats::default(),
        })
    }

    pub fn service(&self) -> &AccessService {
        &self.service
    }

    pub fn run(&mut self, events: &[Event]) -> WardenResult<ReplayStats> {
        for (index, event) in events.iter().enumerate() {
            tracing::debug!(index, kind = event.kind(), "replaying event");
            self.apply(event)?;
            self.stats.events += 1;
        }
        Ok(self.stats)
    }

    pub fn apply(&mut self, event: &Event) -> WardenResult<()> {
        match event {
            Event::AddUser { user_id } => {
                self.service.add_user(*user_id)?;
            }
            Event::RemoveUser { user_id } => {
                self.service.remove_user(*user_id)?;
                self.listeners.clear_user(*user_id);
            }
            Event::AddPackage(package_state) => {
                self.service.add_package(package_state)?;
            }
            Event::RemovePackage { package_name } => {
                let state = self.service.snapshot()?;
                match state.system().package_states.get(package_name) {
                    Some(package_state) => {
                        self.service.remove_package(package_state)?;
                    }
                    None => tracing::warn!(%package_name, "remove_package: unknown package"),
                }
            }
            Event::SetDecision {
                subject,
                object,
                decision,
            } => {
                self.service.set_decision(subject, object, *decision)?;
            }
            Event::Check {
                subject,
                object,
                expect,
            } => {
                let decision = self.service.get_decision(subject, object)?;
                self.stats.checks += 1;
                tracing::info!(%subject, %object, %decision, "check");
                if let Some(expected) = expect {
                    if *expected != decision {
                        return Err(WardenError::InvalidInput(format!(
                            "check {subject} -> {object}: expected {expected}, got {decision}"
                        )));
                    }
                }
            }
            Event::Subscribe { listener, user_id } => {
                let instance = self.listener(listener)?;
                if self.listeners.add_listener(instance, *user_id) {
                    self.stats.subscriptions += 1;
                } else {
                    tracing::warn!(listener = %listener, %user_id, "subscribe: listener rejected");
                }
            }
            Event::Unsubscribe { listener, user_id } => {
                let removed = match self.named.get(listener) {
                    Some(instance) => self.listeners.remove_listener(instance, *user_id),
                    None => false,
                };
                if !removed {
                    tracing::warn!(listener = %listener, %user_id, "unsubscribe: not subscribed");
                }
            }
            Event::Publish { user_id, data } => {
                self.stats.deliveries += self.publish(*user_id, data);
            }
        }
        Ok(())
    }

    fn publish(&self, user_id: UserId, data: &SafetyCenterData) -> usize {
        self.listeners.deliver_update_to_user(user_id, data)
    }

    fn listener(&mut self, name: &str) -> WardenResult<Arc<dyn DataChangedListener>> {
        if let Some(existing) = self.named.get(name) {
            return Ok(Arc::clone(existing));
        }
        let created: Arc<dyn DataChangedListener> = match &self.sink {
            SinkSpec::Log => Arc::new(LogListener {
                name: name.to_string(),
            }),
            SinkSpec::NdjsonStdout => Arc::new(JsonStreamListener::stdout(name)),
            SinkSpec::NdjsonFile(path) => {
                let file = self
                    .file
                    .as_ref()
                    .ok_or_else(|| WardenError::Internal(format!("sink file {path} not open")))?
                    .try_clone()
                    .map_err(|e| WardenError::Internal(format!("cannot share sink file: {e}")))?;
                Arc::new(JsonStreamListener::new(name, file))
            }
        };
        self.named.insert(name.to_string(), Arc::clone(&created));
        Ok(created)
    }
}
