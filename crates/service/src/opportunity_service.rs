use std::sync::Arc;

use serde::Serialize;

use pipeline_core::{
    Account, AccountRef, Campaign, Contact, Opportunity, OpportunityForm, Preferences,
    RelatedKind, RelatedRef, Scope, SessionState, User,
};
use pipeline_storage::{ListQuery, Page, StageTotals, Storage, StorageError};

use crate::error::{ServiceError, ValidationErrors};
use crate::hook::ListQueryHook;
use crate::validation::{account_ref, validate};

/// Everything the edit form needs besides the candidate pickers.
#[derive(Debug, Clone, Serialize)]
pub struct EditData {
    pub opportunity: Opportunity,
    pub account: Account,
    /// Neighbouring record for prev/next navigation; a failed lookup is
    /// silently dropped rather than failing the edit.
    pub previous: Option<Opportunity>,
}

/// A resolved related record the "new opportunity" form was opened from.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "lowercase")]
pub enum RelatedRecord {
    Account(Account),
    Campaign(Campaign),
    Contact(Contact),
}

pub struct OpportunityService {
    storage: Arc<Storage>,
    hooks: Vec<Arc<dyn ListQueryHook>>,
}

impl OpportunityService {
    #[must_use]
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage, hooks: Vec::new() }
    }

    /// Registers list-query hooks, tried in order on every listing.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Vec<Arc<dyn ListQueryHook>>) -> Self {
        self.hooks = hooks;
        self
    }

    /// The list pipeline: merge preferences with session state, offer the
    /// result to the hook chain, fall back to the default scoped query.
    pub fn list(
        &self,
        scope: &Scope,
        prefs: &Preferences,
        session: &SessionState,
    ) -> Result<Page<Opportunity>, ServiceError> {
        let query = ListQuery {
            page: session.current_page.max(1),
            per_page: prefs.per_page,
            sort: prefs.sort_by,
            stages: session.stage_filter.clone(),
            query: session.current_query.clone(),
        };
        for hook in &self.hooks {
            if let Some(page) = hook.list(scope, &query) {
                return Ok(page);
            }
        }
        Ok(self.storage.list_opportunities(scope, &query)?)
    }

    /// Lists, and when the current page has emptied out underneath the
    /// session (e.g. after deleting its last record), steps back one page
    /// and lists again. Mutates the session's page cursor accordingly.
    pub fn list_stepping_back(
        &self,
        scope: &Scope,
        prefs: &Preferences,
        session: &mut SessionState,
    ) -> Result<Page<Opportunity>, ServiceError> {
        let page = self.list(scope, prefs, session)?;
        if page.is_empty() && session.current_page > 1 {
            session.current_page -= 1;
            return self.list(scope, prefs, session);
        }
        Ok(page)
    }

    pub fn sidebar(&self, scope: &Scope) -> Result<StageTotals, ServiceError> {
        Ok(self.storage.stage_totals(scope)?)
    }

    pub fn show(&self, scope: &Scope, id: &str) -> Result<Opportunity, ServiceError> {
        Ok(self.storage.get_opportunity(scope, id)?)
    }

    /// Candidate pickers for the new/edit form: assignable users (site
    /// minus self) and accounts in alphabetical order.
    pub fn form_candidates(
        &self,
        scope: &Scope,
    ) -> Result<(Vec<User>, Vec<Account>), ServiceError> {
        let users = self.storage.site_users_except(scope)?;
        let accounts = self.storage.accounts_ordered(scope)?;
        Ok((users, accounts))
    }

    pub fn resolve_related(
        &self,
        scope: &Scope,
        related: &RelatedRef,
    ) -> Result<RelatedRecord, ServiceError> {
        let record = match related.kind {
            RelatedKind::Account => {
                RelatedRecord::Account(self.storage.get_account(scope, &related.id)?)
            },
            RelatedKind::Campaign => {
                RelatedRecord::Campaign(self.storage.get_campaign(scope, &related.id)?)
            },
            RelatedKind::Contact => {
                RelatedRecord::Contact(self.storage.get_contact(scope, &related.id)?)
            },
        };
        Ok(record)
    }

    pub fn edit_data(
        &self,
        scope: &Scope,
        id: &str,
        previous_id: Option<&str>,
    ) -> Result<EditData, ServiceError> {
        let opportunity = self.storage.get_opportunity(scope, id)?;
        let account = self.storage.get_account(scope, &opportunity.account_id)?;
        let previous = match previous_id {
            Some(prev_id) => match self.storage.get_opportunity(scope, prev_id) {
                Ok(prev) => Some(prev),
                Err(StorageError::NotFound { .. }) => None,
                Err(e) => return Err(e.into()),
            },
            None => None,
        };
        Ok(EditData { opportunity, account, previous })
    }

    /// Creates the opportunity together with its account link (or new
    /// account) and permission grants as one logical unit, then refreshes
    /// the linked campaign's cached summary.
    pub fn create(
        &self,
        scope: &Scope,
        form: &OpportunityForm,
    ) -> Result<Opportunity, ServiceError> {
        let account = self.validated_account(form)?;
        let opportunity = self
            .storage
            .create_opportunity(scope, form, &account)
            .map_err(remap_account_duplicate)?;
        self.refresh_campaign(scope, opportunity.campaign_id.as_deref());
        Ok(opportunity)
    }

    pub fn update(
        &self,
        scope: &Scope,
        id: &str,
        form: &OpportunityForm,
    ) -> Result<Opportunity, ServiceError> {
        let existing = self.storage.get_opportunity(scope, id)?;
        let account = self.validated_account(form)?;
        let updated = self
            .storage
            .update_opportunity(scope, id, form, &account)
            .map_err(remap_account_duplicate)?;
        // Both sides of a campaign re-link need their summaries redone.
        self.refresh_campaign(scope, existing.campaign_id.as_deref());
        if updated.campaign_id != existing.campaign_id {
            self.refresh_campaign(scope, updated.campaign_id.as_deref());
        }
        Ok(updated)
    }

    /// Deletes and returns the record; the caller still needs its name for
    /// the confirmation notice and its campaign for the related view.
    pub fn destroy(&self, scope: &Scope, id: &str) -> Result<Opportunity, ServiceError> {
        let deleted = self.storage.delete_opportunity(scope, id)?;
        self.refresh_campaign(scope, deleted.campaign_id.as_deref());
        Ok(deleted)
    }

    /// User ids the record is shared with, for the access picker.
    pub fn permitted_user_ids(&self, id: &str) -> Result<Vec<String>, ServiceError> {
        Ok(self.storage.permitted_user_ids(id)?)
    }

    pub fn reload_campaign(
        &self,
        scope: &Scope,
        id: &str,
    ) -> Result<Campaign, ServiceError> {
        Ok(self.storage.get_campaign(scope, id)?)
    }

    /// Looks up an account for 422 form re-population; `None` when it is
    /// gone (the form falls back to a blank one).
    pub fn find_account(&self, scope: &Scope, id: &str) -> Option<Account> {
        self.storage.get_account(scope, id).ok()
    }

    pub fn find_contact(&self, scope: &Scope, id: &str) -> Option<Contact> {
        self.storage.get_contact(scope, id).ok()
    }

    pub fn find_campaign(&self, scope: &Scope, id: &str) -> Option<Campaign> {
        self.storage.get_campaign(scope, id).ok()
    }

    fn validated_account(&self, form: &OpportunityForm) -> Result<AccountRef, ServiceError> {
        let errors = validate(form);
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }
        // validate() guarantees the account field resolves.
        account_ref(&form.account)
            .ok_or_else(|| ServiceError::InvalidInput("missing account".to_string()))
    }

    /// Summary refresh is best-effort: a vanished campaign must not fail
    /// the save that referenced it moments ago.
    fn refresh_campaign(&self, scope: &Scope, campaign_id: Option<&str>) {
        let Some(id) = campaign_id else { return };
        if let Err(e) = self.storage.refresh_campaign_summary(scope, id) {
            tracing::warn!("Campaign summary refresh failed for {}: {}", id, e);
        }
    }
}

/// A duplicate account name surfaces as a form error, not a 500.
fn remap_account_duplicate(err: StorageError) -> ServiceError {
    if err.is_duplicate() {
        let mut errors = ValidationErrors::default();
        errors.add("account.name", "has already been taken");
        ServiceError::Validation(errors)
    } else {
        ServiceError::Storage(err)
    }
}
