//! Per-consumer theme state (compatibility mode).
//!
//! A [`LocalTheme`] is what every consumer gets when there is no shared
//! coordinator: each instance reads the OS and storage on its own, registers
//! its own OS and storage listeners, and writes storage itself.
//!
//! Behavior differs from [`ThemeCoordinator`](crate::ThemeCoordinator) on OS
//! changes: the instance flips its current theme instead of re-deriving it
//! from the new OS value, so it drifts once its value and the OS disagree.
//! Prefer the coordinator; this type exists so both behaviors can be run
//! side by side.
//!
//! ```rust
//! use themesync::env::{MemoryStore, MockColorScheme, Platform};
//! use themesync::{CoordinatorConfig, LocalTheme, Theme};
//!
//! let os = MockColorScheme::new(Theme::Light);
//! let local = LocalTheme::new(
//!     Platform::headless().with_scheme(os.clone()).with_store(MemoryStore::new()),
//!     CoordinatorConfig::default(),
//! );
//! local.mount();
//! local.set(Theme::Dark);
//!
//! // The OS moves to dark; the local value toggles away from it.
//! os.emulate(Theme::Dark);
//! assert_eq!(local.get(), Theme::Light);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::env::{Platform, Subscription};
use crate::listeners::{ListenerId, ListenerSet};
use crate::{CoordinatorConfig, Theme};

#[derive(Default)]
struct LocalState {
    theme: Theme,
    mounted: bool,
}

struct LocalInner {
    config: CoordinatorConfig,
    platform: Platform,
    state: RefCell<LocalState>,
    listeners: ListenerSet,
    generation: Cell<u64>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Theme state owned by a single consumer.
#[derive(Clone)]
pub struct LocalTheme {
    inner: Rc<LocalInner>,
}

impl LocalTheme {
    /// Creates an unmounted instance holding the default theme.
    pub fn new(platform: Platform, config: CoordinatorConfig) -> Self {
        let theme = config.default_theme;
        Self {
            inner: Rc::new(LocalInner {
                config,
                platform,
                state: RefCell::new(LocalState {
                    theme,
                    mounted: false,
                }),
                listeners: ListenerSet::default(),
                generation: Cell::new(0),
                subscriptions: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Reads the initial theme, applies it and registers this instance's
    /// own listeners. Mounting twice is a no-op.
    pub fn mount(&self) -> Theme {
        if self.inner.state.borrow().mounted {
            return self.get();
        }
        let config = &self.inner.config;

        if self.inner.platform.is_headless() {
            let mut state = self.inner.state.borrow_mut();
            state.mounted = true;
            state.theme = config.default_theme;
            return state.theme;
        }

        let theme = self
            .stored_theme()
            .unwrap_or_else(|| self.os_theme().unwrap_or(config.default_theme));
        {
            let mut state = self.inner.state.borrow_mut();
            state.mounted = true;
            state.theme = theme;
        }
        self.apply(theme);
        self.register_platform_listeners();
        tracing::debug!(%theme, "local theme mounted");
        theme
    }

    /// The current theme of this instance.
    pub fn get(&self) -> Theme {
        self.inner.state.borrow().theme
    }

    /// Sets this instance's theme.
    pub fn set(&self, theme: Theme) {
        self.change("set", theme);
    }

    /// Registers a listener for changes of this instance's theme.
    pub fn subscribe(&self, listener: impl Fn(Theme) + 'static) -> ListenerId {
        self.inner.listeners.add(Rc::new(listener))
    }

    /// Removes a listener.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Releases this instance's OS and storage listeners.
    pub fn unmount(&self) {
        self.inner.subscriptions.borrow_mut().clear();
        self.inner.state.borrow_mut().mounted = false;
    }

    /// Reacts to an OS preference change by toggling, whatever the new value.
    fn on_os_change(&self) {
        let toggled = self.get().opposite();
        self.change("os", toggled);
    }

    /// Reacts to another context writing storage by adopting what storage
    /// now holds; a removed key re-derives from the OS.
    fn on_storage_change(&self) {
        let theme = self
            .stored_theme()
            .unwrap_or_else(|| self.os_theme().unwrap_or(self.inner.config.default_theme));
        self.change("external", theme);
    }

    fn change(&self, cause: &'static str, theme: Theme) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.theme == theme {
                return;
            }
            state.theme = theme;
            if !state.mounted {
                return;
            }
        }
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);
        tracing::debug!(cause, %theme, "local theme changed");
        self.apply(theme);
        self.inner
            .listeners
            .notify(theme, || self.inner.generation.get() == generation);
    }

    /// Presentation flag, then persistence: the key is removed when the
    /// theme matches the OS as queried right now, written otherwise.
    fn apply(&self, theme: Theme) {
        let platform = &self.inner.platform;
        if let Some(flag) = &platform.flag {
            flag.set_dark(theme.is_dark());
        }
        let Some(store) = &platform.store else {
            return;
        };
        let key = &self.inner.config.storage_key;
        let result = if self.os_theme() == Some(theme) {
            store.remove(key)
        } else {
            store.write(key, theme.as_str())
        };
        if let Err(err) = result {
            tracing::warn!(%err, "local theme not persisted");
        }
    }

    fn stored_theme(&self) -> Option<Theme> {
        let store = self.inner.platform.store.as_ref()?;
        let raw = store
            .read(&self.inner.config.storage_key)
            .unwrap_or_else(|err| {
                tracing::warn!(%err, "theme storage unreadable");
                None
            });
        self.inner.config.parse_override(raw.as_deref())
    }

    fn os_theme(&self) -> Option<Theme> {
        let scheme = self.inner.platform.scheme.as_ref()?;
        scheme.prefers_dark().ok().map(Theme::from_dark)
    }

    fn register_platform_listeners(&self) {
        let platform = &self.inner.platform;
        let mut subscriptions = Vec::new();

        if let Some(scheme) = &platform.scheme {
            let weak = Rc::downgrade(&self.inner);
            if let Ok(subscription) = scheme.watch(Rc::new(move |_dark| {
                if let Some(local) = Self::upgrade(&weak) {
                    local.on_os_change();
                }
            })) {
                subscriptions.push(subscription);
            }
        }

        if let Some(channel) = &platform.channel {
            let weak = Rc::downgrade(&self.inner);
            if let Ok(subscription) = channel.watch(
                &self.inner.config.storage_key,
                Rc::new(move |_raw: Option<String>| {
                    if let Some(local) = Self::upgrade(&weak) {
                        local.on_storage_change();
                    }
                }),
            ) {
                subscriptions.push(subscription);
            }
        }

        self.inner.subscriptions.borrow_mut().extend(subscriptions);
    }

    fn upgrade(weak: &Weak<LocalInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}
