//! In-memory same-origin storage shared by several execution contexts.
//!
//! [`SharedOrigin`] plays the role of a browser profile's `localStorage` for
//! one origin, and each [`OriginContext`] plays one tab. A write through one
//! context queues a change notification for every *other* context watching
//! the key; the writer never hears its own writes, and writes that leave a
//! value unchanged notify nobody.
//!
//! Notifications are delivered by [`SharedOrigin::dispatch_pending`], which
//! stands in for the host event loop: contexts are independent, so a change
//! is only observed elsewhere once the loop turns.
//!
//! ```rust
//! use std::rc::Rc;
//! use std::cell::RefCell;
//! use themesync::env::{ChangeChannel, ThemeStore};
//! use themesync::SharedOrigin;
//!
//! let origin = SharedOrigin::new();
//! let tab_a = origin.context();
//! let tab_b = origin.context();
//!
//! let seen = Rc::new(RefCell::new(None));
//! let sink = Rc::clone(&seen);
//! let _watch = tab_b
//!     .watch("theme", Rc::new(move |value| *sink.borrow_mut() = value))
//!     .unwrap();
//!
//! tab_a.write("theme", "dark").unwrap();
//! assert_eq!(*seen.borrow(), None);
//!
//! origin.dispatch_pending();
//! assert_eq!(seen.borrow().as_deref(), Some("dark"));
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use crate::env::{ChangeCallback, ChangeChannel, Subscription, ThemeStore};
use crate::ThemeError;

struct Watcher {
    id: u64,
    context: u64,
    key: String,
    callback: ChangeCallback,
}

struct Pending {
    target: u64,
    key: String,
    value: Option<String>,
}

#[derive(Default)]
struct OriginState {
    values: HashMap<String, String>,
    watchers: Vec<Watcher>,
    queue: VecDeque<Pending>,
    next_context: u64,
    next_watcher: u64,
}

impl OriginState {
    fn record(&mut self, writer: u64, key: &str, value: Option<&str>) {
        let previous = match value {
            Some(value) => self.values.insert(key.to_string(), value.to_string()),
            None => self.values.remove(key),
        };
        if previous.as_deref() == value {
            return;
        }
        // Contexts without a live watcher on `key` are skipped.
        let mut targets: Vec<u64> = self
            .watchers
            .iter()
            .filter(|w| w.context != writer && w.key == key)
            .map(|w| w.context)
            .collect();
        targets.sort_unstable();
        targets.dedup();
        for target in targets {
            self.queue.push_back(Pending {
                target,
                key: key.to_string(),
                value: value.map(str::to_string),
            });
        }
    }
}

/// Storage shared by every context of one origin.
#[derive(Clone, Default)]
pub struct SharedOrigin {
    state: Rc<RefCell<OriginState>>,
}

impl SharedOrigin {
    /// An empty origin with no contexts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new execution context on this origin.
    pub fn context(&self) -> OriginContext {
        let mut state = self.state.borrow_mut();
        let id = state.next_context;
        state.next_context += 1;
        OriginContext {
            origin: self.clone(),
            id,
        }
    }

    /// Current value of `key`, as any context would read it.
    pub fn get(&self, key: &str) -> Option<String> {
        self.state.borrow().values.get(key).cloned()
    }

    /// Number of notifications waiting for delivery.
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Delivers queued notifications in order until the queue is empty,
    /// including any queued by the callbacks themselves. Returns how many
    /// callbacks ran.
    pub fn dispatch_pending(&self) -> usize {
        let mut delivered = 0;
        loop {
            let (callbacks, value) = {
                let mut state = self.state.borrow_mut();
                let Some(pending) = state.queue.pop_front() else {
                    break;
                };
                let callbacks: Vec<ChangeCallback> = state
                    .watchers
                    .iter()
                    .filter(|w| w.context == pending.target && w.key == pending.key)
                    .map(|w| Rc::clone(&w.callback))
                    .collect();
                (callbacks, pending.value)
            };
            for callback in callbacks {
                callback(value.clone());
                delivered += 1;
            }
        }
        delivered
    }
}

/// One execution context (tab, window, frame) of a [`SharedOrigin`].
///
/// Clones refer to the same context.
#[derive(Clone)]
pub struct OriginContext {
    origin: SharedOrigin,
    id: u64,
}

impl OriginContext {
    /// The origin this context belongs to.
    pub fn origin(&self) -> &SharedOrigin {
        &self.origin
    }
}

impl ThemeStore for OriginContext {
    fn read(&self, key: &str) -> Result<Option<String>, ThemeError> {
        Ok(self.origin.get(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), ThemeError> {
        self.origin
            .state
            .borrow_mut()
            .record(self.id, key, Some(value));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ThemeError> {
        self.origin.state.borrow_mut().record(self.id, key, None);
        Ok(())
    }
}

impl ChangeChannel for OriginContext {
    fn watch(&self, key: &str, callback: ChangeCallback) -> Result<Subscription, ThemeError> {
        let mut state = self.origin.state.borrow_mut();
        let id = state.next_watcher;
        state.next_watcher += 1;
        state.watchers.push(Watcher {
            id,
            context: self.id,
            key: key.to_string(),
            callback,
        });

        let weak: Weak<RefCell<OriginState>> = Rc::downgrade(&self.origin.state);
        Ok(Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().watchers.retain(|w| w.id != id);
            }
        }))
    }
}
