//! Explicitly owned shared state with change notification.
//!
//! A [`SharedStore`] is the single writer-side owner of a value. Handles are
//! cloned and passed to whoever needs to read, write or observe it; there is
//! no global instance.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

pub const DEFAULT_MESSAGE: &str = "No message";

#[derive(Debug)]
pub struct SharedStore<T> {
    sender: Arc<watch::Sender<T>>,
}

impl<T> Clone for SharedStore<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T> SharedStore<T>
where
    T: Clone + PartialEq,
{
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Replaces the value. Subscribers are only woken when it actually changes.
    pub fn set(&self, value: T) -> bool {
        self.sender.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        })
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.sender.send_modify(f);
    }

    /// The receiver sees the current value immediately and is notified on
    /// every later change.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T> Default for SharedStore<T>
where
    T: Clone + PartialEq + Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// One text message shared between a sender and any number of viewers.
#[derive(Debug, Clone)]
pub struct MessageStore {
    inner: SharedStore<String>,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            inner: SharedStore::new(DEFAULT_MESSAGE.to_string()),
        }
    }

    pub fn set_message(&self, text: impl Into<String>) {
        let text = text.into();
        if self.inner.set(text) {
            debug!("message updated");
        }
    }

    pub fn clear(&self) {
        self.set_message(DEFAULT_MESSAGE);
    }

    pub fn message(&self) -> String {
        self.inner.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.inner.subscribe()
    }
}
