//! # themesync - light/dark theme reconciliation
//!
//! `themesync` decides which of two themes, light or dark, a host should
//! present, and keeps that decision in step with three independent inputs:
//!
//! - the OS color-scheme preference, observed live
//! - an explicit user override, persisted under one storage key
//! - other execution contexts (tabs, windows) sharing the same storage
//!
//! ## Core Concepts
//!
//! - [`Theme`]: the two-valued theme
//! - [`ThemeCoordinator`]: single owner of theme state per context; all
//!   consumers read and write through clones of it
//! - [`LocalTheme`]: per-consumer state, kept for compatibility with hosts
//!   that cannot share a coordinator
//! - [`env`]: the platform collaborators (OS query, store, change channel,
//!   presentation flag) and their mocks
//! - [`CoordinatorConfig`]: storage key, dark class, fallback theme and the
//!   policy for malformed stored values
//!
//! ## Reconciliation
//!
//! The effective theme is the override if there is one, else the OS
//! preference, else light. An override equal to the OS preference is
//! dropped (and removed from storage) the moment that is true, so storage
//! only ever holds a value that actually diverges from the OS.
//!
//! ## Quick Start
//!
//! ```rust
//! use themesync::env::{MockColorScheme, Platform, RecordingFlag};
//! use themesync::{CoordinatorConfig, SharedOrigin, Theme, ThemeCoordinator};
//!
//! let origin = SharedOrigin::new();
//! let os = MockColorScheme::new(Theme::Light);
//!
//! let tab = |flag: &RecordingFlag| {
//!     ThemeCoordinator::new(
//!         Platform::headless()
//!             .with_scheme(os.clone())
//!             .with_origin(origin.context())
//!             .with_flag(flag.clone()),
//!         CoordinatorConfig::default(),
//!     )
//! };
//! let (flag_a, flag_b) = (RecordingFlag::new(), RecordingFlag::new());
//! let (a, b) = (tab(&flag_a), tab(&flag_b));
//! a.initialize();
//! b.initialize();
//!
//! a.set(Theme::Dark);
//! origin.dispatch_pending();
//!
//! assert_eq!(b.get(), Theme::Dark);
//! assert_eq!(flag_b.is_dark(), Some(true));
//! ```
//!
//! ## Headless Rendering
//!
//! ```rust
//! use themesync::{Theme, ThemeCoordinator};
//!
//! let coordinator = ThemeCoordinator::headless();
//! assert_eq!(coordinator.initialize(), Theme::Light);
//! ```

mod config;
mod coordinator;
pub mod env;
mod error;
mod file_store;
mod listeners;
mod local;
mod origin;
pub mod reconcile;
pub mod system;
mod theme;

pub use config::{CoordinatorConfig, MalformedPolicy, DEFAULT_DARK_CLASS, DEFAULT_STORAGE_KEY};
pub use coordinator::{ThemeCoordinator, ThemeSnapshot};
pub use error::ThemeError;
pub use file_store::FileStore;
pub use listeners::{Listener, ListenerId};
pub use local::LocalTheme;
pub use origin::{OriginContext, SharedOrigin};
pub use theme::Theme;

// Re-export mock types for testing
pub use env::{MemoryStore, MockColorScheme, RecordingFlag};
