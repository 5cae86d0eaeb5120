use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_OUTLINE, DEFAULT_PER_PAGE, MAX_PER_PAGE};
use crate::opportunity::SortBy;

/// A user's opportunity-list display settings, resolved against defaults.
///
/// Stored as raw string key/value pairs per user; this struct is the
/// parsed view handed to the list pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    pub per_page: u32,
    pub outline: String,
    pub sort_by: SortBy,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            outline: DEFAULT_OUTLINE.to_string(),
            sort_by: SortBy::default(),
        }
    }
}

impl Preferences {
    /// Builds preferences from raw stored strings, falling back to the
    /// default for any key that is missing or unparseable.
    pub fn resolve(
        per_page: Option<&str>,
        outline: Option<&str>,
        sort_by: Option<&str>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            per_page: per_page
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|&n| n > 0)
                .map_or(defaults.per_page, |n| n.min(MAX_PER_PAGE)),
            outline: outline.map_or(defaults.outline, str::to_string),
            sort_by: sort_by.and_then(|v| v.parse().ok()).unwrap_or(defaults.sort_by),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_falls_back_to_defaults() {
        let prefs = Preferences::resolve(None, None, None);
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn resolve_parses_stored_values() {
        let prefs = Preferences::resolve(Some("5"), Some("short"), Some("amount"));
        assert_eq!(prefs.per_page, 5);
        assert_eq!(prefs.outline, "short");
        assert_eq!(prefs.sort_by, SortBy::Amount);
    }

    #[test]
    fn resolve_ignores_garbage_and_caps_per_page() {
        let prefs = Preferences::resolve(Some("lots"), None, Some("vibes"));
        assert_eq!(prefs.per_page, DEFAULT_PER_PAGE);
        assert_eq!(prefs.sort_by, SortBy::CreatedAt);

        let capped = Preferences::resolve(Some("9999"), None, None);
        assert_eq!(capped.per_page, MAX_PER_PAGE);
    }

    #[test]
    fn zero_per_page_is_rejected() {
        let prefs = Preferences::resolve(Some("0"), None, None);
        assert_eq!(prefs.per_page, DEFAULT_PER_PAGE);
    }
}
