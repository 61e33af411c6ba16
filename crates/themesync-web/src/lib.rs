//! Browser bindings for `themesync`.
//!
//! [`browser_platform`] assembles the collaborators a page offers:
//!
//! - [`MediaQueryScheme`]: `matchMedia("(prefers-color-scheme: dark)")`
//! - [`LocalStorage`]: `localStorage` and the window `storage` event, which
//!   browsers fire in every *other* same-origin tab after a write
//! - [`DocumentClass`]: the `dark` class on `<html>`
//!
//! Whatever is missing is simply left out; outside a browser (server-side
//! rendering, native tests) the platform is headless and the coordinator
//! answers `light` without touching anything.
//!
//! Pages that drive the theme from JavaScript use [`WebThemeCoordinator`]:
//!
//! ```js
//! const theme = new WebThemeCoordinator();
//! const id = theme.subscribe((value) => render(value));
//! button.onclick = () => theme.setTheme(theme.theme === "light" ? "dark" : "light");
//! ```

mod platform;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use wasm_bindgen::prelude::*;

use themesync::env::Platform;
use themesync::{CoordinatorConfig, ListenerId, Theme, ThemeCoordinator};

pub use platform::{DocumentClass, LocalStorage, MediaQueryScheme, DARK_QUERY};

/// Installs the panic hook so Rust panics show up in the browser console.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// Builds the platform available in the current page.
pub fn browser_platform(config: &CoordinatorConfig) -> Platform {
    if !cfg!(target_arch = "wasm32") {
        return Platform::headless();
    }
    let Some(window) = web_sys::window() else {
        return Platform::headless();
    };

    let mut platform = Platform::headless();
    match MediaQueryScheme::from_window(&window) {
        Some(scheme) => platform = platform.with_scheme(scheme),
        None => tracing::debug!("matchMedia unavailable"),
    }
    match LocalStorage::from_window(&window) {
        Some(storage) => platform = platform.with_store(storage.clone()).with_channel(storage),
        None => tracing::debug!("localStorage unavailable, theme will not persist"),
    }
    if let Some(flag) = window
        .document()
        .and_then(|document| DocumentClass::from_document(&document, config.dark_class.as_str()))
    {
        platform = platform.with_flag(flag);
    }
    platform
}

/// Creates and initializes a coordinator for the current page.
pub fn page_coordinator(config: CoordinatorConfig) -> ThemeCoordinator {
    let platform = browser_platform(&config);
    let coordinator = ThemeCoordinator::new(platform, config);
    coordinator.initialize();
    coordinator
}

/// JavaScript-facing coordinator for one page.
#[wasm_bindgen]
pub struct WebThemeCoordinator {
    coordinator: ThemeCoordinator,
    listeners: RefCell<HashMap<u32, ListenerId>>,
    next_listener: Cell<u32>,
}

#[wasm_bindgen]
impl WebThemeCoordinator {
    /// Creates and initializes the page coordinator.
    ///
    /// `storageKey` defaults to `"theme"`, `darkClass` to `"dark"`.
    #[wasm_bindgen(constructor)]
    pub fn new(storage_key: Option<String>, dark_class: Option<String>) -> WebThemeCoordinator {
        let mut config = CoordinatorConfig::default();
        if let Some(key) = storage_key {
            config = config.storage_key(key);
        }
        if let Some(class) = dark_class {
            config = config.dark_class(class);
        }
        WebThemeCoordinator {
            coordinator: page_coordinator(config),
            listeners: RefCell::new(HashMap::new()),
            next_listener: Cell::new(0),
        }
    }

    /// The effective theme, `"light"` or `"dark"`.
    #[wasm_bindgen(getter)]
    pub fn theme(&self) -> String {
        self.coordinator.get().as_str().to_string()
    }

    /// Sets the theme. Throws on anything but `"light"` or `"dark"`.
    #[wasm_bindgen(js_name = setTheme)]
    pub fn set_theme(&self, theme: &str) -> Result<(), JsValue> {
        let theme: Theme = theme
            .parse()
            .map_err(|err: themesync::ThemeError| JsValue::from_str(&err.to_string()))?;
        self.coordinator.set(theme);
        Ok(())
    }

    /// Calls `callback(theme)` whenever the effective theme changes.
    /// Returns an id for [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(&self, callback: js_sys::Function) -> u32 {
        let listener = self.coordinator.subscribe(move |theme| {
            if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(theme.as_str())) {
                tracing::warn!(?err, "theme listener threw");
            }
        });
        let id = self.next_listener.get();
        self.next_listener.set(id.wrapping_add(1));
        self.listeners.borrow_mut().insert(id, listener);
        id
    }

    /// Removes a listener registered with [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&self, id: u32) -> bool {
        match self.listeners.borrow_mut().remove(&id) {
            Some(listener) => self.coordinator.unsubscribe(listener),
            None => false,
        }
    }

    /// Stops listening to the OS and other tabs.
    pub fn dispose(&self) {
        self.coordinator.shutdown();
    }
}
