//! Native OS color-scheme detection.
//!
//! [`SystemColorScheme`] answers the OS preference through `dark-light`.
//! Native desktops expose no change notification through it, so the query
//! cannot be watched; hosts that want live updates run a [`SchemePoller`]
//! and feed changes to
//! [`ThemeCoordinator::on_os_preference_change`](crate::ThemeCoordinator::on_os_preference_change).
//!
//! The detector is process-wide and can be replaced, which is how tests pin
//! the OS answer:
//!
//! ```rust
//! use themesync::system::{detect_prefers_dark, reset_scheme_detector, set_scheme_detector};
//!
//! set_scheme_detector(|| Ok(true));
//! assert!(detect_prefers_dark().unwrap());
//! reset_scheme_detector();
//! ```

use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::env::{ColorSchemeQuery, SchemeCallback, Subscription};
use crate::{Theme, ThemeError};

type SchemeDetector = fn() -> Result<bool, ThemeError>;

static SCHEME_DETECTOR: Lazy<Mutex<SchemeDetector>> = Lazy::new(|| Mutex::new(os_scheme_detector));

/// Overrides the detector used to answer "does the OS prefer dark?".
pub fn set_scheme_detector(detector: SchemeDetector) {
    let mut guard = SCHEME_DETECTOR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = detector;
}

/// Restores the OS-backed detector.
pub fn reset_scheme_detector() {
    set_scheme_detector(os_scheme_detector);
}

/// Runs the configured detector.
pub fn detect_prefers_dark() -> Result<bool, ThemeError> {
    let detector = *SCHEME_DETECTOR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    detector()
}

#[cfg(not(target_arch = "wasm32"))]
fn os_scheme_detector() -> Result<bool, ThemeError> {
    match dark_light::detect() {
        Ok(dark_light::Mode::Dark) => Ok(true),
        Ok(dark_light::Mode::Light) => Ok(false),
        Ok(dark_light::Mode::Unspecified) => Err(ThemeError::unsupported(
            "OS reports no color scheme preference",
        )),
        Err(err) => Err(ThemeError::unsupported(format!("{err:?}"))),
    }
}

#[cfg(target_arch = "wasm32")]
fn os_scheme_detector() -> Result<bool, ThemeError> {
    Err(ThemeError::unsupported(
        "no native color scheme on wasm; use the browser query",
    ))
}

/// OS color-scheme query backed by the process-wide detector.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemColorScheme;

impl ColorSchemeQuery for SystemColorScheme {
    fn prefers_dark(&self) -> Result<bool, ThemeError> {
        detect_prefers_dark()
    }

    fn watch(&self, _callback: SchemeCallback) -> Result<Subscription, ThemeError> {
        Err(ThemeError::unsupported(
            "native color scheme changes must be polled",
        ))
    }
}

/// Turns repeated detector calls into change events.
#[derive(Debug, Default)]
pub struct SchemePoller {
    last: Option<Theme>,
}

impl SchemePoller {
    /// A poller that has seen nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A poller that treats `theme` as already seen.
    pub fn starting_at(theme: Theme) -> Self {
        Self { last: Some(theme) }
    }

    /// Queries the detector and returns the theme if it differs from the
    /// previous answer. Failed queries are skipped.
    pub fn poll(&mut self) -> Option<Theme> {
        let theme = match detect_prefers_dark() {
            Ok(dark) => Theme::from_dark(dark),
            Err(err) => {
                tracing::debug!(%err, "color scheme poll failed");
                return None;
            }
        };
        if self.last == Some(theme) {
            return None;
        }
        self.last = Some(theme);
        Some(theme)
    }
}
