//! Observer registry for state changes.
//!
//! Subscribers receive the full [`State`] synchronously after every committed
//! mutation, and once immediately when they subscribe.

use std::fmt;

use crate::state::State;

/// Handle returned by [`Observers::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&State)>;

/// Ordered list of state subscribers.
#[derive(Default)]
pub struct Observers {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback)>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` and replay `current` to it right away.
    pub fn subscribe<F>(&mut self, current: &State, mut callback: F) -> SubscriptionId
    where
        F: FnMut(&State) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        callback(current);
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Deliver `state` to every subscriber in subscription order.
    pub fn notify(&mut self, state: &State) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(state);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.subscribers.len()
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
