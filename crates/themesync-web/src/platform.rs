//! `web-sys` implementations of the themesync collaborators.

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, MediaQueryList, MediaQueryListEvent, Storage, StorageEvent, Window,
};

use themesync::env::{
    ChangeCallback, ChangeChannel, ColorSchemeQuery, PresentationFlag, SchemeCallback,
    Subscription, ThemeStore,
};
use themesync::ThemeError;

/// Media query answering "does the OS prefer dark?".
pub const DARK_QUERY: &str = "(prefers-color-scheme: dark)";

fn js_error(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

/// Decides whether a `storage` event concerns `watched`.
///
/// Events from another storage area (`sessionStorage`) never do. A `null`
/// event key means the whole area was cleared, which removes every key.
/// Returns the value to report, if relevant.
pub(crate) fn relevant_change(
    watched: &str,
    same_area: bool,
    event_key: Option<&str>,
    new_value: Option<String>,
) -> Option<Option<String>> {
    if !same_area {
        return None;
    }
    match event_key {
        None => Some(None),
        Some(key) if key == watched => Some(new_value),
        Some(_) => None,
    }
}

/// `matchMedia("(prefers-color-scheme: dark)")`.
pub struct MediaQueryScheme {
    list: MediaQueryList,
}

impl MediaQueryScheme {
    /// Opens the query, or `None` if the browser does not support it.
    pub fn from_window(window: &Window) -> Option<Self> {
        window
            .match_media(DARK_QUERY)
            .ok()
            .flatten()
            .map(|list| Self { list })
    }
}

impl ColorSchemeQuery for MediaQueryScheme {
    fn prefers_dark(&self) -> Result<bool, ThemeError> {
        Ok(self.list.matches())
    }

    fn watch(&self, callback: SchemeCallback) -> Result<Subscription, ThemeError> {
        let on_change: Closure<dyn Fn(MediaQueryListEvent)> =
            Closure::new(move |event: MediaQueryListEvent| callback(event.matches()));
        self.list
            .add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref())
            .map_err(|err| ThemeError::unsupported(js_error(&err)))?;

        let list = self.list.clone();
        Ok(Subscription::new(move || {
            if let Err(err) = list
                .remove_event_listener_with_callback("change", on_change.as_ref().unchecked_ref())
            {
                tracing::debug!(err = %js_error(&err), "color scheme listener already gone");
            }
        }))
    }
}

/// `window.localStorage`, plus the window's `storage` event as the
/// cross-context channel.
#[derive(Clone)]
pub struct LocalStorage {
    window: Window,
    storage: Storage,
}

impl LocalStorage {
    /// Opens local storage, or `None` when it is disabled or inaccessible
    /// (private mode, sandboxed frames, blocked cookies).
    pub fn from_window(window: &Window) -> Option<Self> {
        window
            .local_storage()
            .ok()
            .flatten()
            .map(|storage| Self {
                window: window.clone(),
                storage,
            })
    }
}

impl ThemeStore for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<String>, ThemeError> {
        self.storage
            .get_item(key)
            .map_err(|err| ThemeError::storage(js_error(&err)))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), ThemeError> {
        self.storage
            .set_item(key, value)
            .map_err(|err| ThemeError::storage(js_error(&err)))
    }

    fn remove(&self, key: &str) -> Result<(), ThemeError> {
        self.storage
            .remove_item(key)
            .map_err(|err| ThemeError::storage(js_error(&err)))
    }
}

impl ChangeChannel for LocalStorage {
    fn watch(&self, key: &str, callback: ChangeCallback) -> Result<Subscription, ThemeError> {
        let watched = key.to_string();
        let storage = self.storage.clone();
        let on_storage: Closure<dyn Fn(StorageEvent)> = Closure::new(move |event: StorageEvent| {
            let same_area = event.storage_area().as_ref() == Some(&storage);
            let key = event.key();
            if let Some(value) =
                relevant_change(&watched, same_area, key.as_deref(), event.new_value())
            {
                callback(value);
            }
        });
        self.window
            .add_event_listener_with_callback("storage", on_storage.as_ref().unchecked_ref())
            .map_err(|err| ThemeError::unsupported(js_error(&err)))?;

        let window = self.window.clone();
        Ok(Subscription::new(move || {
            if let Err(err) = window
                .remove_event_listener_with_callback("storage", on_storage.as_ref().unchecked_ref())
            {
                tracing::debug!(err = %js_error(&err), "storage listener already gone");
            }
        }))
    }
}

/// Toggles a class on the document root (`<html>`).
pub struct DocumentClass {
    root: Element,
    class: String,
}

impl DocumentClass {
    /// Targets `document.documentElement`, or `None` if there is none.
    pub fn from_document(document: &Document, class: impl Into<String>) -> Option<Self> {
        document.document_element().map(|root| Self {
            root,
            class: class.into(),
        })
    }
}

impl PresentationFlag for DocumentClass {
    fn set_dark(&self, dark: bool) {
        let classes = self.root.class_list();
        let result = if dark {
            classes.add_1(&self.class)
        } else {
            classes.remove_1(&self.class)
        };
        if let Err(err) = result {
            tracing::warn!(
                class = %self.class,
                err = %js_error(&err),
                "could not update root class"
            );
        }
    }
}
