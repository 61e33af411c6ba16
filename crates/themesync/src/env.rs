//! Platform abstractions for testability.
//!
//! The coordinators never talk to the host directly. They see four
//! collaborators, each behind a trait:
//!
//! - [`ColorSchemeQuery`]: the OS "prefers dark?" query and its change signal
//! - [`ThemeStore`]: the durable, origin-scoped key-value store
//! - [`ChangeChannel`]: notifications of writes made by *other* contexts
//! - [`PresentationFlag`]: the single "dark mode active" flag on the document
//!
//! A [`Platform`] bundles whichever of them the host provides. A platform
//! with none of them is headless: coordinators built on it never touch
//! storage or the document.
//!
//! Listener registrations hand back a [`Subscription`] guard that unregisters
//! on drop.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::{OriginContext, Theme, ThemeError};

/// Callback receiving the new "prefers dark?" answer.
pub type SchemeCallback = Rc<dyn Fn(bool)>;

/// Callback receiving the new raw stored value (`None` when removed).
pub type ChangeCallback = Rc<dyn Fn(Option<String>)>;

/// Abstraction over the OS color-scheme preference.
pub trait ColorSchemeQuery {
    /// Whether the OS currently prefers a dark color scheme.
    fn prefers_dark(&self) -> Result<bool, ThemeError>;

    /// Registers `callback` to run whenever the preference changes.
    ///
    /// Returns an error when the host cannot push changes.
    fn watch(&self, callback: SchemeCallback) -> Result<Subscription, ThemeError>;
}

/// Abstraction over the durable key-value store.
pub trait ThemeStore {
    /// Reads a key. `Ok(None)` when absent.
    fn read(&self, key: &str) -> Result<Option<String>, ThemeError>;

    /// Writes a key.
    fn write(&self, key: &str, value: &str) -> Result<(), ThemeError>;

    /// Removes a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), ThemeError>;
}

/// Abstraction over cross-context change notifications for the store.
///
/// Implementations must only report writes made by other execution contexts,
/// never the watcher's own.
pub trait ChangeChannel {
    /// Registers `callback` for changes to `key`.
    fn watch(&self, key: &str, callback: ChangeCallback) -> Result<Subscription, ThemeError>;
}

/// Abstraction over the document-level presentation flag.
pub trait PresentationFlag {
    /// Marks the document as dark (`true`) or light (`false`). Idempotent.
    fn set_dark(&self, dark: bool);
}

/// Scoped listener registration.
///
/// Dropping the guard, or calling [`release`](Subscription::release),
/// unregisters the listener.
#[must_use = "dropping a Subscription unregisters its listener immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Creates a guard that runs `release` once when dropped.
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Unregisters now.
    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// The set of collaborators available to a coordinator.
///
/// ```rust
/// use themesync::env::{MemoryStore, MockColorScheme, Platform, RecordingFlag};
/// use themesync::Theme;
///
/// let platform = Platform::headless()
///     .with_scheme(MockColorScheme::new(Theme::Dark))
///     .with_store(MemoryStore::new())
///     .with_flag(RecordingFlag::new());
/// assert!(!platform.is_headless());
/// ```
#[derive(Default)]
pub struct Platform {
    pub(crate) scheme: Option<Box<dyn ColorSchemeQuery>>,
    pub(crate) store: Option<Box<dyn ThemeStore>>,
    pub(crate) channel: Option<Box<dyn ChangeChannel>>,
    pub(crate) flag: Option<Box<dyn PresentationFlag>>,
}

impl Platform {
    /// A platform with no collaborators at all (server-side rendering,
    /// tests, non-interactive contexts).
    pub fn headless() -> Self {
        Self::default()
    }

    /// Adds the OS color-scheme query.
    pub fn with_scheme(mut self, scheme: impl ColorSchemeQuery + 'static) -> Self {
        self.scheme = Some(Box::new(scheme));
        self
    }

    /// Adds the durable store.
    pub fn with_store(mut self, store: impl ThemeStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Adds the cross-context change channel.
    pub fn with_channel(mut self, channel: impl ChangeChannel + 'static) -> Self {
        self.channel = Some(Box::new(channel));
        self
    }

    /// Adds the presentation flag.
    pub fn with_flag(mut self, flag: impl PresentationFlag + 'static) -> Self {
        self.flag = Some(Box::new(flag));
        self
    }

    /// Uses one context of a [`SharedOrigin`](crate::SharedOrigin) as both
    /// the store and the change channel.
    pub fn with_origin(self, context: OriginContext) -> Self {
        self.with_store(context.clone()).with_channel(context)
    }

    /// True when no collaborator is present.
    pub fn is_headless(&self) -> bool {
        self.scheme.is_none()
            && self.store.is_none()
            && self.channel.is_none()
            && self.flag.is_none()
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("scheme", &self.scheme.is_some())
            .field("store", &self.store.is_some())
            .field("channel", &self.channel.is_some())
            .field("flag", &self.flag.is_some())
            .finish()
    }
}

// === Mock implementations for testing ===

#[derive(Default)]
struct SchemeState {
    prefers_dark: Option<bool>,
    watchers: Vec<(u64, SchemeCallback)>,
    next_id: u64,
}

/// Mock OS color-scheme query.
///
/// Clones share state, so a test can keep one handle and give another to
/// the platform. [`emulate`](MockColorScheme::emulate) behaves like the
/// browser's `change` event: watchers fire synchronously, and only when the
/// answer actually flips.
#[derive(Clone, Default)]
pub struct MockColorScheme {
    state: Rc<RefCell<SchemeState>>,
}

impl MockColorScheme {
    /// A query currently answering `theme`.
    pub fn new(theme: Theme) -> Self {
        let scheme = Self::default();
        scheme.state.borrow_mut().prefers_dark = Some(theme.is_dark());
        scheme
    }

    /// A query that cannot answer and cannot be watched.
    pub fn unsupported() -> Self {
        Self::default()
    }

    /// Changes the emulated OS preference, notifying watchers on a flip.
    pub fn emulate(&self, theme: Theme) {
        let callbacks: Vec<SchemeCallback> = {
            let mut state = self.state.borrow_mut();
            if state.prefers_dark == Some(theme.is_dark()) {
                return;
            }
            state.prefers_dark = Some(theme.is_dark());
            state.watchers.iter().map(|(_, cb)| Rc::clone(cb)).collect()
        };
        for callback in callbacks {
            callback(theme.is_dark());
        }
    }

    /// Number of live watchers.
    pub fn watcher_count(&self) -> usize {
        self.state.borrow().watchers.len()
    }
}

impl ColorSchemeQuery for MockColorScheme {
    fn prefers_dark(&self) -> Result<bool, ThemeError> {
        self.state
            .borrow()
            .prefers_dark
            .ok_or_else(|| ThemeError::unsupported("mock color scheme has no answer"))
    }

    fn watch(&self, callback: SchemeCallback) -> Result<Subscription, ThemeError> {
        let mut state = self.state.borrow_mut();
        if state.prefers_dark.is_none() {
            return Err(ThemeError::unsupported("mock color scheme cannot be watched"));
        }
        let id = state.next_id;
        state.next_id += 1;
        state.watchers.push((id, callback));

        let weak: Weak<RefCell<SchemeState>> = Rc::downgrade(&self.state);
        Ok(Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().watchers.retain(|(existing, _)| *existing != id);
            }
        }))
    }
}

/// In-memory store, shared between clones.
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<HashMap<String, String>>>,
    unavailable: bool,
    writes: Rc<Cell<usize>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails, like disabled `localStorage`.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Seeds a value.
    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.borrow_mut().insert(key.into(), value.into());
        self
    }

    /// Current value of `key`, bypassing the trait.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    /// Number of successful writes and removals so far.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    fn check(&self) -> Result<(), ThemeError> {
        if self.unavailable {
            Err(ThemeError::storage("memory store disabled"))
        } else {
            Ok(())
        }
    }
}

impl ThemeStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, ThemeError> {
        self.check()?;
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), ThemeError> {
        self.check()?;
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ThemeError> {
        self.check()?;
        self.values.borrow_mut().remove(key);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// Presentation flag that records every value applied to it.
#[derive(Clone, Default)]
pub struct RecordingFlag {
    history: Rc<RefCell<Vec<bool>>>,
}

impl RecordingFlag {
    /// A flag that has never been applied.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last applied value, if any.
    pub fn is_dark(&self) -> Option<bool> {
        self.history.borrow().last().copied()
    }

    /// Every applied value, oldest first.
    pub fn history(&self) -> Vec<bool> {
        self.history.borrow().clone()
    }
}

impl PresentationFlag for RecordingFlag {
    fn set_dark(&self, dark: bool) {
        self.history.borrow_mut().push(dark);
    }
}
