use std::sync::Arc;

use pipeline_core::{
    Preferences, SortBy, MAX_PER_PAGE, PREF_OUTLINE, PREF_PER_PAGE, PREF_SORT_BY,
};
use pipeline_storage::Storage;

use crate::error::ServiceError;

/// Preference values the redraw endpoint may supply; `None` keeps the
/// stored value.
#[derive(Debug, Clone, Default)]
pub struct PreferenceUpdate {
    pub per_page: Option<u32>,
    pub outline: Option<String>,
    pub sort_by: Option<SortBy>,
}

pub struct PreferenceService {
    storage: Arc<Storage>,
}

impl PreferenceService {
    #[must_use]
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// The user's opportunity-list settings, resolved against the system
    /// defaults for anything unset.
    pub fn resolve(&self, user_id: &str) -> Result<Preferences, ServiceError> {
        let per_page = self.storage.get_preference(user_id, PREF_PER_PAGE)?;
        let outline = self.storage.get_preference(user_id, PREF_OUTLINE)?;
        let sort_by = self.storage.get_preference(user_id, PREF_SORT_BY)?;
        Ok(Preferences::resolve(per_page.as_deref(), outline.as_deref(), sort_by.as_deref()))
    }

    /// Persists any supplied settings and returns the refreshed result.
    pub fn update(
        &self,
        user_id: &str,
        update: &PreferenceUpdate,
    ) -> Result<Preferences, ServiceError> {
        if let Some(per_page) = update.per_page {
            if per_page == 0 || per_page > MAX_PER_PAGE {
                return Err(ServiceError::InvalidInput(format!(
                    "per_page must be between 1 and {MAX_PER_PAGE}"
                )));
            }
            self.storage.set_preference(user_id, PREF_PER_PAGE, &per_page.to_string())?;
        }
        if let Some(outline) = update.outline.as_deref() {
            self.storage.set_preference(user_id, PREF_OUTLINE, outline)?;
        }
        if let Some(sort_by) = update.sort_by {
            self.storage.set_preference(user_id, PREF_SORT_BY, sort_by.as_str())?;
        }
        self.resolve(user_id)
    }
}
