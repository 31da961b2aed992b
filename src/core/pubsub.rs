//! # Publish / Subscribe
//!
//! A small synchronous channel. The navigation controller owns one as a field
//! and exposes `subscribe` / `unsubscribe` itself.
//!
//! Subscribers are called in subscription order, on the publishing thread,
//! before `publish` returns. A subscriber may subscribe, unsubscribe or
//! publish again from inside its callback; it sees the subscriber list as it
//! was when the current `publish` started.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::error::NavError;

/// Topics the navigation controller publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// Published when a navigation starts.
    Start,
    /// Published exactly once when a started navigation ends, however it ends.
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    Start {
        path: String,
    },
    End {
        path: String,
        success: bool,
        error: Option<NavError>,
    },
}

impl NavEvent {
    pub fn path(&self) -> &str {
        match self {
            NavEvent::Start { path } | NavEvent::End { path, .. } => path,
        }
    }

    pub fn topic(&self) -> Topic {
        match self {
            NavEvent::Start { .. } => Topic::Start,
            NavEvent::End { .. } => Topic::End,
        }
    }
}

/// Returned by `subscribe`, handed back to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionKey(u64);

type Subscriber = Rc<dyn Fn(&NavEvent)>;

pub struct PubSub {
    next_key: Cell<u64>,
    subscribers: RefCell<Vec<(SubscriptionKey, Topic, Subscriber)>>,
}

impl Default for PubSub {
    fn default() -> Self {
        Self::new()
    }
}

impl PubSub {
    pub fn new() -> Self {
        Self {
            next_key: Cell::new(1),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> SubscriptionKey
    where
        F: Fn(&NavEvent) + 'static,
    {
        let key = SubscriptionKey(self.next_key.get());
        self.next_key.set(key.0 + 1);
        self.subscribers
            .borrow_mut()
            .push((key, topic, Rc::new(callback)));
        key
    }

    /// Returns `false` if the key was unknown (or already removed).
    pub fn unsubscribe(&self, key: SubscriptionKey) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(k, _, _)| *k != key);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|(_, t, _)| *t == topic)
            .count()
    }

    pub fn publish(&self, event: &NavEvent) {
        let topic = event.topic();
        let matching: Vec<Subscriber> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|(_, t, _)| *t == topic)
            .map(|(_, _, callback)| Rc::clone(callback))
            .collect();
        for callback in matching {
            callback(event);
        }
    }
}
