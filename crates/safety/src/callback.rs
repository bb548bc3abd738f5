//! Death-aware callback list with snapshot broadcasts.
//!
//! [`CallbackList`] is the multiplexing primitive the listener registry is
//! built on. It is internally synchronized: callbacks can be registered and
//! unregistered from any thread, including while a [`Broadcast`] obtained
//! earlier is being iterated. A broadcast only ever sees the membership at
//! the moment it began.

use smallvec::SmallVec;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A callback whose remote end can go away.
pub trait RemoteCallback: Send + Sync {
    /// `false` once the remote end is gone. Dead callbacks are pruned on the
    /// next access to the list.
    fn is_alive(&self) -> bool {
        true
    }
}

struct Inner<L: ?Sized> {
    callbacks: Vec<Arc<L>>,
    killed: bool,
}

impl<L: RemoteCallback + ?Sized> Inner<L> {
    fn position(&self, callback: &Arc<L>) -> Option<usize> {
        self.callbacks.iter().position(|c| same_callback(c, callback))
    }

    fn prune_dead(&mut self) {
        self.callbacks.retain(|c| c.is_alive());
    }
}

/// Callbacks are identified by allocation, not by value.
fn same_callback<L: ?Sized>(a: &Arc<L>, b: &Arc<L>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

pub struct CallbackList<L: RemoteCallback + ?Sized> {
    inner: Mutex<Inner<L>>,
}

impl<L: RemoteCallback + ?Sized> Default for CallbackList<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: RemoteCallback + ?Sized> CallbackList<L> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                callbacks: Vec::new(),
                killed: false,
            }),
        }
    }

    // The list holds plain data; a panic elsewhere cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, Inner<L>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `false` if the callback is already dead or the list was killed.
    /// Registering an already-registered callback succeeds without duplicating it.
    pub fn register(&self, callback: Arc<L>) -> bool {
        let mut inner = self.lock();
        if inner.killed || !callback.is_alive() {
            return false;
        }
        inner.prune_dead();
        if inner.position(&callback).is_none() {
            inner.callbacks.push(callback);
        }
        true
    }

    /// Returns `false` if the callback was never registered.
    pub fn unregister(&self, callback: &Arc<L>) -> bool {
        let mut inner = self.lock();
        let removed = match inner.position(callback) {
            Some(i) => {
                inner.callbacks.remove(i);
                true
            }
            None => false,
        };
        inner.prune_dead();
        removed
    }

    pub fn is_registered(&self, callback: &Arc<L>) -> bool {
        let inner = self.lock();
        inner
            .position(callback)
            .is_some_and(|i| inner.callbacks[i].is_alive())
    }

    pub fn registered_count(&self) -> usize {
        let mut inner = self.lock();
        inner.prune_dead();
        inner.callbacks.len()
    }

    /// Takes a snapshot of the live callbacks.
    pub fn begin_broadcast(&self) -> Broadcast<'_, L> {
        let mut inner = self.lock();
        inner.prune_dead();
        Broadcast {
            list: self,
            items: inner.callbacks.iter().cloned().collect(),
            dead: SmallVec::new(),
        }
    }

    /// Drops every callback and refuses further registrations.
    pub fn kill(&self) {
        let mut inner = self.lock();
        inner.callbacks.clear();
        inner.killed = true;
    }

    fn remove_all(&self, dead: &[Arc<L>]) {
        let mut inner = self.lock();
        inner
            .callbacks
            .retain(|c| !dead.iter().any(|d| same_callback(c, d)));
    }
}

/// A point-in-time view of a [`CallbackList`].
///
/// Callbacks marked dead with [`Broadcast::mark_dead`] are unregistered when
/// the broadcast finishes (explicitly or on drop).
pub struct Broadcast<'a, L: RemoteCallback + ?Sized> {
    list: &'a CallbackList<L>,
    items: SmallVec<[Arc<L>; 4]>,
    dead: SmallVec<[usize; 4]>,
}

impl<L: RemoteCallback + ?Sized> Broadcast<'_, L> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<L>> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<L>> {
        self.items.iter()
    }

    pub fn mark_dead(&mut self, index: usize) {
        if index < self.items.len() && !self.dead.contains(&index) {
            self.dead.push(index);
        }
    }

    pub fn finish(self) {}
}

impl<L: RemoteCallback + ?Sized> Drop for Broadcast<'_, L> {
    fn drop(&mut self) {
        if self.dead.is_empty() {
            return;
        }
        let dead: Vec<Arc<L>> = self.dead.iter().map(|&i| Arc::clone(&self.items[i])).collect();
        self.list.remove_all(&dead);
    }
}
