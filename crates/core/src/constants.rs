//! Shared constants for pipeline-crm.

/// Default list page size when the user has no stored preference.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Upper bound on the page size a client can request.
pub const MAX_PER_PAGE: u32 = 100;

/// Default row detail level for the opportunity list.
pub const DEFAULT_OUTLINE: &str = "long";

/// Preference key: opportunity list page size.
pub const PREF_PER_PAGE: &str = "opportunities_per_page";

/// Preference key: opportunity list row detail level.
pub const PREF_OUTLINE: &str = "opportunities_outline";

/// Preference key: opportunity list sort order.
pub const PREF_SORT_BY: &str = "opportunities_sort_by";
