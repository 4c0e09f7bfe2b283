//! Hat silhouettes and the label parsing boundary.

use std::fmt;

/// A named hat silhouette.
///
/// Free-text style labels are turned into a `HatStyle` exactly once, by
/// [`HatStyle::parse`]. Everything downstream matches on the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HatStyle {
    /// A single dome. Also the fallback for unknown labels.
    #[default]
    Beanie,
    /// A tapered crown over a flat brim.
    Fedora,
    /// A short flared crown over a flat brim.
    Bucket,
}

impl HatStyle {
    /// Every known style.
    pub const ALL: [HatStyle; 3] = [HatStyle::Beanie, HatStyle::Fedora, HatStyle::Bucket];

    /// Parses a user-entered label, ignoring case.
    ///
    /// Unknown and empty labels resolve to [`HatStyle::Beanie`]. This is the
    /// defined default, not an error.
    pub fn parse(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "fedora" => Self::Fedora,
            "bucket" => Self::Bucket,
            _ => Self::Beanie,
        }
    }

    /// Returns the lowercase style name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beanie => "beanie",
            Self::Fedora => "fedora",
            Self::Bucket => "bucket",
        }
    }
}

impl fmt::Display for HatStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for HatStyle {
    fn from(label: &str) -> Self {
        Self::parse(label)
    }
}
