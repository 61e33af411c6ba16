//! The two-valued display theme.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ThemeError;

/// A display theme: either light or dark.
///
/// Stored and transmitted as the lowercase strings `"light"` and `"dark"`.
///
/// # Example
///
/// ```rust
/// use themesync::Theme;
///
/// let theme: Theme = "dark".parse().unwrap();
/// assert_eq!(theme, Theme::Dark);
/// assert_eq!(theme.opposite(), Theme::Light);
/// assert_eq!(Theme::Light.as_str(), "light");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme. Also the fallback when nothing else is known.
    #[default]
    Light,
    /// Dark theme.
    Dark,
}

impl Theme {
    /// Maps a "prefers dark?" answer to a theme.
    pub fn from_dark(dark: bool) -> Self {
        if dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    /// Returns `true` for [`Theme::Dark`].
    pub fn is_dark(self) -> bool {
        matches!(self, Theme::Dark)
    }

    /// Returns the other theme.
    pub fn opposite(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// The canonical string used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ThemeError;

    /// Parses exactly `"light"` or `"dark"`. Anything else, including other
    /// casings or surrounding whitespace, is malformed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(ThemeError::MalformedValue(other.to_string())),
        }
    }
}
