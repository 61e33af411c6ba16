//! The shared theme coordinator.
//!
//! One [`ThemeCoordinator`] owns the theme state of an execution context.
//! Consumers hold clones of it (clones share state) and never touch storage
//! or the OS signal themselves, so the storage key has exactly one reader
//! and writer per context and the platform listeners are registered once,
//! for the coordinator's lifetime.
//!
//! # Transitions
//!
//! Every input goes through the same path:
//!
//! 1. update the inputs ([`ThemeInputs`]) and prune a redundant override
//! 2. write the override through to storage if the stored value differs
//!    (write when present, remove when absent)
//! 3. re-apply the presentation flag if the effective theme changed
//! 4. notify subscribers if the effective theme changed
//!
//! No internal borrow is held during steps 2-4, so subscribers may call back
//! into the coordinator.
//!
//! # Example
//!
//! ```rust
//! use themesync::env::{MemoryStore, MockColorScheme, Platform};
//! use themesync::{CoordinatorConfig, Theme, ThemeCoordinator};
//!
//! let os = MockColorScheme::new(Theme::Light);
//! let store = MemoryStore::new();
//! let platform = Platform::headless()
//!     .with_scheme(os.clone())
//!     .with_store(store.clone());
//!
//! let coordinator = ThemeCoordinator::new(platform, CoordinatorConfig::default());
//! assert_eq!(coordinator.initialize(), Theme::Light);
//!
//! coordinator.set(Theme::Dark);
//! assert_eq!(store.get("theme").as_deref(), Some("dark"));
//!
//! // The OS catches up with the override: the override is dropped.
//! os.emulate(Theme::Dark);
//! assert_eq!(coordinator.get(), Theme::Dark);
//! assert_eq!(store.get("theme"), None);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::Serialize;

use crate::env::{Platform, Subscription};
use crate::listeners::{ListenerId, ListenerSet};
use crate::reconcile::ThemeInputs;
use crate::{CoordinatorConfig, Theme};

/// Serializable view of a coordinator's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemeSnapshot {
    /// Last known OS preference.
    pub os_preference: Option<Theme>,
    /// Override currently in force.
    #[serde(rename = "override")]
    pub override_theme: Option<Theme>,
    /// Theme being presented.
    pub effective: Theme,
    /// Whether [`ThemeCoordinator::initialize`] has run.
    pub initialized: bool,
}

#[derive(Default)]
struct State {
    inputs: ThemeInputs,
    initialized: bool,
    /// Raw value believed to be in storage.
    stored: Option<String>,
    /// Last value handed to the presentation flag.
    presented: Option<Theme>,
}

struct Inner {
    config: CoordinatorConfig,
    platform: Platform,
    state: RefCell<State>,
    listeners: ListenerSet,
    /// Bumped on every change of the effective theme.
    generation: Cell<u64>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Single owner of the theme state for one execution context.
#[derive(Clone)]
pub struct ThemeCoordinator {
    inner: Rc<Inner>,
}

struct Effects {
    before: Theme,
    after: Theme,
    persist: Option<Option<Theme>>,
    present: bool,
}

impl ThemeCoordinator {
    /// Creates an uninitialized coordinator.
    ///
    /// Until [`initialize`](Self::initialize) runs, [`get`](Self::get)
    /// returns the configured default and changes stay in memory.
    pub fn new(platform: Platform, config: CoordinatorConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                config,
                platform,
                state: RefCell::new(State::default()),
                listeners: ListenerSet::default(),
                generation: Cell::new(0),
                subscriptions: RefCell::new(Vec::new()),
            }),
        }
    }

    /// A coordinator with no collaborators, for non-interactive rendering.
    pub fn headless() -> Self {
        Self::new(Platform::headless(), CoordinatorConfig::default())
    }

    /// The configuration in use.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Reads the OS preference and stored override, applies the result and
    /// starts listening for OS and cross-context changes.
    ///
    /// On a headless platform this returns the default theme without any
    /// platform access. Calling it again is a no-op.
    pub fn initialize(&self) -> Theme {
        if self.inner.state.borrow().initialized {
            tracing::debug!("theme coordinator already initialized");
            return self.get();
        }

        let platform = &self.inner.platform;
        let config = &self.inner.config;

        if platform.is_headless() {
            self.inner.state.borrow_mut().initialized = true;
            let theme = self.get();
            tracing::debug!(%theme, "headless theme coordinator");
            return theme;
        }

        let os = match &platform.scheme {
            Some(scheme) => match scheme.prefers_dark() {
                Ok(dark) => Theme::from_dark(dark),
                Err(err) => {
                    tracing::warn!(
                        %err,
                        fallback = %config.default_theme,
                        "OS color scheme unavailable"
                    );
                    config.default_theme
                }
            },
            None => config.default_theme,
        };

        let raw = match &platform.store {
            Some(store) => store.read(&config.storage_key).unwrap_or_else(|err| {
                tracing::warn!(%err, "theme storage unreadable, running in memory");
                None
            }),
            None => None,
        };
        let override_theme = config.parse_override(raw.as_deref());

        self.transition("initialize", |state| {
            state.initialized = true;
            state.stored = raw;
            state.inputs = ThemeInputs::new(Some(os), override_theme);
        });

        self.register_platform_listeners();
        self.get()
    }

    /// The effective theme.
    pub fn get(&self) -> Theme {
        self.inner
            .state
            .borrow()
            .inputs
            .effective(self.inner.config.default_theme)
    }

    /// Whether [`initialize`](Self::initialize) has run.
    pub fn is_initialized(&self) -> bool {
        self.inner.state.borrow().initialized
    }

    /// Sets an explicit override. Choosing the current OS preference clears
    /// the override instead of pinning it.
    pub fn set(&self, theme: Theme) {
        self.transition("set", |state| state.inputs.apply_override(Some(theme)));
    }

    /// Reacts to a change of the OS preference.
    ///
    /// Called by the platform subscription; hosts whose OS signal cannot
    /// push (native polling) call it directly.
    pub fn on_os_preference_change(&self, theme: Theme) {
        self.transition("os", |state| state.inputs.apply_os_preference(theme));
    }

    /// Reacts to another context writing the storage key. `None` means the
    /// key was removed.
    pub fn on_external_storage_change(&self, raw: Option<&str>) {
        let parsed = self.inner.config.parse_override(raw);
        self.transition("external", |state| {
            state.stored = raw.map(str::to_string);
            state.inputs.apply_override(parsed);
        });
    }

    /// Registers a listener for changes of the effective theme.
    pub fn subscribe(&self, listener: impl Fn(Theme) + 'static) -> ListenerId {
        self.inner.listeners.add(Rc::new(listener))
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Current inputs and effective theme.
    pub fn snapshot(&self) -> ThemeSnapshot {
        let state = self.inner.state.borrow();
        ThemeSnapshot {
            os_preference: state.inputs.os_preference,
            override_theme: state.inputs.override_theme,
            effective: state.inputs.effective(self.inner.config.default_theme),
            initialized: state.initialized,
        }
    }

    /// Releases the OS and cross-context subscriptions.
    ///
    /// Dropping the last handle does the same. The state stays readable.
    pub fn shutdown(&self) {
        let released: Vec<Subscription> = self.inner.subscriptions.borrow_mut().drain(..).collect();
        tracing::debug!(count = released.len(), "releasing theme subscriptions");
        drop(released);
    }

    fn register_platform_listeners(&self) {
        let platform = &self.inner.platform;
        let mut subscriptions = Vec::new();

        if let Some(scheme) = &platform.scheme {
            let weak = Rc::downgrade(&self.inner);
            match scheme.watch(Rc::new(move |dark| {
                if let Some(coordinator) = Self::upgrade(&weak) {
                    coordinator.on_os_preference_change(Theme::from_dark(dark));
                }
            })) {
                Ok(subscription) => subscriptions.push(subscription),
                Err(err) => tracing::debug!(%err, "OS color scheme changes will not be observed"),
            }
        }

        if let Some(channel) = &platform.channel {
            let weak = Rc::downgrade(&self.inner);
            match channel.watch(
                &self.inner.config.storage_key,
                Rc::new(move |raw: Option<String>| {
                    if let Some(coordinator) = Self::upgrade(&weak) {
                        coordinator.on_external_storage_change(raw.as_deref());
                    }
                }),
            ) {
                Ok(subscription) => subscriptions.push(subscription),
                Err(err) => tracing::debug!(%err, "cross-context sync disabled"),
            }
        }

        self.inner.subscriptions.borrow_mut().extend(subscriptions);
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn transition(&self, cause: &'static str, update: impl FnOnce(&mut State)) {
        let effects = {
            let mut state = self.inner.state.borrow_mut();
            let default = self.inner.config.default_theme;
            let before = state.inputs.effective(default);
            update(&mut *state);
            let after = state.inputs.effective(default);

            let desired = state.inputs.override_theme;
            let persist = (state.initialized
                && state.stored.as_deref() != desired.map(Theme::as_str))
            .then_some(desired);

            let present = state.initialized && state.presented != Some(after);
            if present {
                state.presented = Some(after);
            }

            Effects {
                before,
                after,
                persist,
                present,
            }
        };

        let changed = effects.before != effects.after;
        let generation = self.inner.generation.get() + 1;
        if changed {
            self.inner.generation.set(generation);
            tracing::debug!(cause, from = %effects.before, to = %effects.after, "theme changed");
        }

        if let Some(desired) = effects.persist {
            self.persist(desired);
        }

        if effects.present {
            if let Some(flag) = &self.inner.platform.flag {
                flag.set_dark(effects.after.is_dark());
            }
        }

        if changed {
            self.inner
                .listeners
                .notify(effects.after, || self.inner.generation.get() == generation);
        }
    }

    fn persist(&self, desired: Option<Theme>) {
        let Some(store) = &self.inner.platform.store else {
            return;
        };
        let key = &self.inner.config.storage_key;
        let result = match desired {
            Some(theme) => store.write(key, theme.as_str()),
            None => store.remove(key),
        };
        match result {
            Ok(()) => {
                self.inner.state.borrow_mut().stored =
                    desired.map(|theme| theme.as_str().to_string());
            }
            Err(err) => {
                tracing::warn!(%err, "theme override not persisted, keeping it in memory");
            }
        }
    }
}

impl fmt::Debug for ThemeCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeCoordinator")
            .field("snapshot", &self.snapshot())
            .field("platform", &self.inner.platform)
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{MemoryStore, MockColorScheme, RecordingFlag};
    use std::cell::Cell;

    struct Fixture {
        os: MockColorScheme,
        store: MemoryStore,
        flag: RecordingFlag,
        coordinator: ThemeCoordinator,
    }

    fn fixture(os_theme: Theme, store: MemoryStore) -> Fixture {
        let os = MockColorScheme::new(os_theme);
        let flag = RecordingFlag::new();
        let platform = Platform::headless()
            .with_scheme(os.clone())
            .with_store(store.clone())
            .with_flag(flag.clone());
        Fixture {
            os,
            store,
            flag,
            coordinator: ThemeCoordinator::new(platform, CoordinatorConfig::default()),
        }
    }

    #[test]
    fn test_get_before_initialize_is_default() {
        let f = fixture(Theme::Dark, MemoryStore::new());
        assert_eq!(f.coordinator.get(), Theme::Light);
        assert!(!f.coordinator.is_initialized());
    }

    #[test]
    fn test_initialize_applies_flag_once() {
        let f = fixture(Theme::Dark, MemoryStore::new());
        assert_eq!(f.coordinator.initialize(), Theme::Dark);
        assert_eq!(f.flag.history(), vec![true]);
    }

    #[test]
    fn test_initialize_twice_is_noop() {
        let f = fixture(Theme::Light, MemoryStore::new());
        f.coordinator.initialize();
        f.coordinator.initialize();
        assert_eq!(f.os.watcher_count(), 1);
        assert_eq!(f.flag.history(), vec![false]);
    }

    #[test]
    fn test_initialize_cleans_redundant_stored_value() {
        let f = fixture(Theme::Dark, MemoryStore::new().with_value("theme", "dark"));
        assert_eq!(f.coordinator.initialize(), Theme::Dark);
        assert_eq!(f.store.get("theme"), None);
        assert_eq!(f.coordinator.snapshot().override_theme, None);
    }

    #[test]
    fn test_set_does_not_rewrite_unchanged_override() {
        let f = fixture(Theme::Light, MemoryStore::new());
        f.coordinator.initialize();
        f.coordinator.set(Theme::Dark);
        f.coordinator.set(Theme::Dark);
        assert_eq!(f.store.write_count(), 1);
    }

    #[test]
    fn test_set_before_initialize_stays_in_memory() {
        let f = fixture(Theme::Light, MemoryStore::new());
        f.coordinator.set(Theme::Dark);
        assert_eq!(f.coordinator.get(), Theme::Dark);
        assert_eq!(f.store.get("theme"), None);
        assert!(f.flag.history().is_empty());
    }

    #[test]
    fn test_listeners_only_on_observable_change() {
        let f = fixture(Theme::Light, MemoryStore::new());
        f.coordinator.initialize();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        f.coordinator.subscribe(move |theme| sink.borrow_mut().push(theme));

        f.coordinator.set(Theme::Dark);
        f.coordinator.set(Theme::Dark);
        // Override is dropped but the effective theme stays dark.
        f.os.emulate(Theme::Dark);
        f.os.emulate(Theme::Light);

        assert_eq!(*seen.borrow(), vec![Theme::Dark, Theme::Light]);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let f = fixture(Theme::Light, MemoryStore::new());
        f.coordinator.initialize();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let id = f.coordinator.subscribe(move |_| counter.set(counter.get() + 1));

        f.coordinator.set(Theme::Dark);
        assert!(f.coordinator.unsubscribe(id));
        f.coordinator.set(Theme::Light);
        assert_eq!(calls.get(), 1);
        assert!(!f.coordinator.unsubscribe(id));
    }

    #[test]
    fn test_listener_may_reenter() {
        let f = fixture(Theme::Light, MemoryStore::new());
        f.coordinator.initialize();
        let handle = f.coordinator.clone();
        f.coordinator.subscribe(move |theme| {
            if theme == Theme::Dark {
                // Bounce straight back to the OS value.
                handle.set(Theme::Light);
            }
        });

        f.coordinator.set(Theme::Dark);
        assert_eq!(f.coordinator.get(), Theme::Light);
        assert_eq!(f.store.get("theme"), None);
        assert_eq!(f.flag.is_dark(), Some(false));
    }

    #[test]
    fn test_nested_changes_are_not_repeated_by_the_outer_round() {
        let f = fixture(Theme::Light, MemoryStore::new());
        f.coordinator.initialize();
        let handle = f.coordinator.clone();
        let bounced = Cell::new(false);
        f.coordinator.subscribe(move |theme| {
            if theme == Theme::Dark && !bounced.replace(true) {
                handle.set(Theme::Light);
                handle.set(Theme::Dark);
            }
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        f.coordinator.subscribe(move |theme| sink.borrow_mut().push(theme));

        f.coordinator.set(Theme::Dark);
        assert_eq!(*seen.borrow(), vec![Theme::Light, Theme::Dark]);
        assert_eq!(f.coordinator.get(), Theme::Dark);
    }

    #[test]
    fn test_headless_initialize_agrees_with_get() {
        let coordinator = ThemeCoordinator::headless();
        coordinator.set(Theme::Dark);
        assert_eq!(coordinator.initialize(), Theme::Dark);
        assert_eq!(coordinator.get(), Theme::Dark);
    }

    #[test]
    fn test_storage_failure_keeps_working_in_memory() {
        let f = fixture(Theme::Light, MemoryStore::unavailable());
        assert_eq!(f.coordinator.initialize(), Theme::Light);
        f.coordinator.set(Theme::Dark);
        assert_eq!(f.coordinator.get(), Theme::Dark);
        assert_eq!(f.flag.is_dark(), Some(true));
    }

    #[test]
    fn test_unsupported_os_falls_back_to_light() {
        let flag = RecordingFlag::new();
        let platform = Platform::headless()
            .with_scheme(MockColorScheme::unsupported())
            .with_flag(flag.clone());
        let coordinator = ThemeCoordinator::new(platform, CoordinatorConfig::default());
        assert_eq!(coordinator.initialize(), Theme::Light);
        assert_eq!(coordinator.snapshot().os_preference, Some(Theme::Light));
    }

    #[test]
    fn test_shutdown_releases_os_watch() {
        let f = fixture(Theme::Light, MemoryStore::new());
        f.coordinator.initialize();
        assert_eq!(f.os.watcher_count(), 1);
        f.coordinator.shutdown();
        assert_eq!(f.os.watcher_count(), 0);

        f.os.emulate(Theme::Dark);
        assert_eq!(f.coordinator.get(), Theme::Light);
    }

    #[test]
    fn test_drop_releases_os_watch() {
        let f = fixture(Theme::Light, MemoryStore::new());
        f.coordinator.initialize();
        let os = f.os.clone();
        drop(f);
        assert_eq!(os.watcher_count(), 0);
    }

    #[test]
    fn test_snapshot_serializes_override_key() {
        let f = fixture(Theme::Light, MemoryStore::new());
        f.coordinator.initialize();
        f.coordinator.set(Theme::Dark);
        let json = serde_json::to_value(f.coordinator.snapshot()).unwrap();
        assert_eq!(json["override"], "dark");
        assert_eq!(json["os_preference"], "light");
        assert_eq!(json["effective"], "dark");
    }
}
