//! Reconciliation rules shared by every coordinator.
//!
//! The effective theme is `override ?? os_preference ?? default`. An
//! override equal to the OS preference is redundant and is dropped as soon
//! as it is detected, so an override only survives while it diverges from
//! the OS. The drop always happens *after* the new value has been recorded:
//! setting the OS value explicitly therefore "snaps back" to following the
//! OS rather than pinning it.
//!
//! These rules are pure; side effects (storage, presentation, listeners) are
//! the caller's business.

use crate::Theme;

/// The two inputs to reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThemeInputs {
    /// Last known OS preference; `None` until the OS has been queried.
    pub os_preference: Option<Theme>,
    /// Explicit override currently in force.
    pub override_theme: Option<Theme>,
}

impl ThemeInputs {
    /// Creates inputs with both values set, already reconciled.
    pub fn new(os_preference: Option<Theme>, override_theme: Option<Theme>) -> Self {
        let mut inputs = Self {
            os_preference,
            override_theme,
        };
        inputs.prune();
        inputs
    }

    /// The theme that should be presented.
    pub fn effective(&self, default: Theme) -> Theme {
        self.override_theme.or(self.os_preference).unwrap_or(default)
    }

    /// Records an explicit or externally observed override, then prunes it.
    pub fn apply_override(&mut self, theme: Option<Theme>) {
        self.override_theme = theme;
        self.prune();
    }

    /// Records a new OS preference, then prunes the override.
    pub fn apply_os_preference(&mut self, theme: Theme) {
        self.os_preference = Some(theme);
        self.prune();
    }

    /// Drops an override that matches the OS preference. Returns whether
    /// anything was dropped.
    pub fn prune(&mut self) -> bool {
        match (self.override_theme, self.os_preference) {
            (Some(chosen), Some(os)) if chosen == os => {
                self.override_theme = None;
                true
            }
            _ => false,
        }
    }
}
