//! Response types (Serialize)

use serde::Serialize;

use pipeline_core::{
    Account, Campaign, CommentDraft, Contact, Opportunity, Preferences, User,
};
use pipeline_service::{RelatedRecord, ValidationErrors};
use pipeline_storage::{Page, StageTotals};

#[derive(Debug, Serialize)]
#[non_exhaustive]
pub struct VersionResponse {
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl From<&Page<Opportunity>> for PaginationMeta {
    fn from(page: &Page<Opportunity>) -> Self {
        Self {
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            total_pages: page.total_pages(),
        }
    }
}

/// The fragment payload for an in-place list refresh: records, paging, and
/// the sidebar stage totals, plus the outline level the rows should render
/// at.
#[derive(Debug, Serialize)]
pub struct ListPayload {
    pub opportunities: Vec<Opportunity>,
    pub pagination: PaginationMeta,
    pub sidebar: StageTotals,
    pub outline: String,
}

impl ListPayload {
    pub fn new(page: Page<Opportunity>, sidebar: StageTotals, outline: String) -> Self {
        Self {
            pagination: PaginationMeta::from(&page),
            opportunities: page.items,
            sidebar,
            outline,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShowResponse {
    pub opportunity: Opportunity,
    /// Empty draft for the detail view's comment box.
    pub comment: CommentDraft,
}

/// Unsaved opportunity the new-record form starts from.
#[derive(Debug, Serialize)]
pub struct OpportunityTemplate {
    pub user_id: String,
    pub name: String,
    pub stage: pipeline_core::Stage,
    pub access: pipeline_core::Access,
    pub probability: u32,
    pub amount: f64,
    pub discount: f64,
}

impl OpportunityTemplate {
    pub fn prospecting(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: String::new(),
            stage: pipeline_core::Stage::Prospecting,
            access: pipeline_core::Access::default(),
            probability: 0,
            amount: 0.0,
            discount: 0.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewResponse {
    /// Unsaved template the form starts from.
    pub opportunity: OpportunityTemplate,
    pub users: Vec<User>,
    pub accounts: Vec<Account>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<RelatedRecord>,
}

#[derive(Debug, Serialize)]
pub struct EditResponse {
    pub opportunity: Opportunity,
    pub account: Account,
    pub users: Vec<User>,
    pub accounts: Vec<Account>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Opportunity>,
    /// User ids the record is shared with, for the access picker.
    pub permitted: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveSuccess {
    pub opportunity: Opportunity,
    /// Present when the request came from the list view: the refreshed
    /// list and sidebar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<ListPayload>,
    /// Present when the saved record links a campaign: its reloaded
    /// summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign: Option<Campaign>,
}

/// 422 body: field errors plus everything the form needs to re-render with
/// the user's values preserved.
#[derive(Debug, Serialize)]
pub struct SaveFailure {
    pub errors: ValidationErrors,
    pub users: Vec<User>,
    pub accounts: Vec<Account>,
    /// The account the form had selected, re-resolved; `None` means render
    /// a blank new-account row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign: Option<Campaign>,
}

#[derive(Debug, Serialize)]
pub struct DestroyResponse {
    pub deleted: DeletedRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<ListPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign: Option<Campaign>,
}

#[derive(Debug, Serialize)]
pub struct DeletedRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SortChoice {
    pub key: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    #[serde(flatten)]
    pub preferences: Preferences,
    pub sort_choices: Vec<SortChoice>,
}
