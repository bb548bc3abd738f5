//! Per-user registry of safety data change listeners.
//!
//! Group membership changes take `&mut self`, so the caller has to serialize
//! them (typically under the same lock that guards the safety data). A group
//! fetched with [`SafetyCenterListeners::get_listeners`] can be broadcast to
//! without that lock: the underlying [`CallbackList`] snapshots membership
//! when the broadcast begins.

use crate::callback::{CallbackList, RemoteCallback};
use crate::data::SafetyCenterData;
use std::collections::BTreeMap;
use std::sync::Arc;
use warden_core::error::{WardenError, WardenResult};
use warden_core::UserId;

/// Receives safety data snapshots. One-way: there is no acknowledgement.
pub trait DataChangedListener: RemoteCallback {
    /// Returning [`WardenError::DeadObject`] unregisters the listener.
    fn on_data_changed(&self, data: &SafetyCenterData) -> WardenResult<()>;
}

pub type ListenerGroup = CallbackList<dyn DataChangedListener>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Delivered,
    Failed,
    Dead,
}

fn deliver(listener: &dyn DataChangedListener, data: &SafetyCenterData) -> Outcome {
    if !listener.is_alive() {
        return Outcome::Dead;
    }
    match listener.on_data_changed(data) {
        Ok(()) => Outcome::Delivered,
        Err(WardenError::DeadObject) => {
            tracing::warn!("listener died during delivery");
            Outcome::Dead
        }
        Err(e) => {
            tracing::error!(error = %e, "Error delivering SafetyCenterData update to listener");
            Outcome::Failed
        }
    }
}

#[derive(Default)]
pub struct SafetyCenterListeners {
    by_user: BTreeMap<UserId, Arc<ListenerGroup>>,
}

impl SafetyCenterListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `data` to a single listener. Failures are logged, never returned.
    ///
    /// Returns whether delivery succeeded.
    pub fn deliver_update(listener: &dyn DataChangedListener, data: &SafetyCenterData) -> bool {
        deliver(listener, data) == Outcome::Delivered
    }

    /// Delivers `data` to every listener in `listeners` as of now, most
    /// recently registered first. Listeners reporting
    /// [`WardenError::DeadObject`] are dropped from the group.
    ///
    /// Returns the number of successful deliveries.
    pub fn deliver_update_to_all(listeners: &ListenerGroup, data: &SafetyCenterData) -> usize {
        let mut broadcast = listeners.begin_broadcast();
        let mut delivered = 0;
        for i in (0..broadcast.len()).rev() {
            let Some(listener) = broadcast.get(i).cloned() else {
                continue;
            };
            match deliver(listener.as_ref(), data) {
                Outcome::Delivered => delivered += 1,
                Outcome::Dead => broadcast.mark_dead(i),
                Outcome::Failed => {}
            }
        }
        broadcast.finish();
        delivered
    }

    /// Delivers `data` to every listener of `user_id`. Returns 0 when the user
    /// has none.
    pub fn deliver_update_to_user(&self, user_id: UserId, data: &SafetyCenterData) -> usize {
        match self.by_user.get(&user_id) {
            Some(listeners) => {
                let delivered = Self::deliver_update_to_all(listeners, data);
                tracing::debug!(%user_id, delivered, "delivered safety data update");
                delivered
            }
            None => 0,
        }
    }

    /// Adds `listener` for `user_id`.
    ///
    /// Returns whether the listener was registered. Returns `true` if it was
    /// already registered.
    pub fn add_listener(
        &mut self,
        listener: Arc<dyn DataChangedListener>,
        user_id: UserId,
    ) -> bool {
        let listeners = self.by_user.entry(user_id).or_default();
        let registered = listeners.register(listener);
        if !registered && listeners.registered_count() == 0 {
            self.by_user.remove(&user_id);
        }
        tracing::debug!(%user_id, registered, "add listener");
        registered
    }

    /// Removes `listener` for `user_id`.
    ///
    /// Returns whether the listener was unregistered. Returns `false` if it
    /// was never registered.
    pub fn remove_listener(
        &mut self,
        listener: &Arc<dyn DataChangedListener>,
        user_id: UserId,
    ) -> bool {
        let Some(listeners) = self.by_user.get(&user_id) else {
            return false;
        };
        let unregistered = listeners.unregister(listener);
        if listeners.registered_count() == 0 {
            self.by_user.remove(&user_id);
        }
        tracing::debug!(%user_id, unregistered, "remove listener");
        unregistered
    }

    /// The listener group for `user_id`, if it has any listeners.
    pub fn get_listeners(&self, user_id: UserId) -> Option<Arc<ListenerGroup>> {
        self.by_user.get(&user_id).cloned()
    }

    /// Users with at least one registered group, in ascending order.
    pub fn user_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.by_user.keys().copied()
    }

    /// Drops the group of a removed user, killing its callback list.
    pub fn clear_user(&mut self, user_id: UserId) {
        if let Some(listeners) = self.by_user.remove(&user_id) {
            listeners.kill();
        }
    }
}
