use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Sales-pipeline stage of an opportunity.
///
/// Rows written by older deployments may carry stage strings outside this
/// set; those are kept verbatim in storage and fall into the sidebar
/// "other" bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Prospecting,
    Analysis,
    Presentation,
    Proposal,
    Negotiation,
    FinalReview,
    Won,
    Lost,
}

impl Stage {
    /// All known stages, in pipeline order. Drives the filter sidebar.
    pub const ALL: [Self; 8] = [
        Self::Prospecting,
        Self::Analysis,
        Self::Presentation,
        Self::Proposal,
        Self::Negotiation,
        Self::FinalReview,
        Self::Won,
        Self::Lost,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prospecting => "prospecting",
            Self::Analysis => "analysis",
            Self::Presentation => "presentation",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::FinalReview => "final_review",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prospecting" => Ok(Self::Prospecting),
            "analysis" => Ok(Self::Analysis),
            "presentation" => Ok(Self::Presentation),
            "proposal" => Ok(Self::Proposal),
            "negotiation" => Ok(Self::Negotiation),
            "final_review" => Ok(Self::FinalReview),
            "won" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            _ => Err(anyhow::anyhow!("Invalid opportunity stage: {}", s)),
        }
    }
}

/// Who besides the owner can see an opportunity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// Visible to every user on the site.
    #[default]
    Public,
    /// Visible to the owner only.
    Private,
    /// Visible to the owner plus explicitly permitted users.
    Shared,
}

impl Access {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Shared => "shared",
        }
    }
}

impl std::str::FromStr for Access {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "shared" => Ok(Self::Shared),
            _ => Err(anyhow::anyhow!("Invalid access level: {}", s)),
        }
    }
}

/// User-selectable sort orders for the opportunity list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
    Amount,
    ClosesOn,
}

impl SortBy {
    /// Human-facing labels shown by the options panel, paired with the
    /// snake_case key the redraw endpoint accepts.
    pub const CHOICES: [(&'static str, Self); 5] = [
        ("date created", Self::CreatedAt),
        ("date updated", Self::UpdatedAt),
        ("name", Self::Name),
        ("amount", Self::Amount),
        ("closing date", Self::ClosesOn),
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Name => "name",
            Self::Amount => "amount",
            Self::ClosesOn => "closes_on",
        }
    }

    /// ORDER BY clause for this sort. Always tie-broken by id so that
    /// repeated listings of unchanged data come back in the same order.
    pub const fn order_clause(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at DESC, id DESC",
            Self::UpdatedAt => "updated_at DESC, id DESC",
            Self::Name => "name COLLATE NOCASE ASC, id ASC",
            Self::Amount => "amount DESC, id DESC",
            Self::ClosesOn => "closes_on ASC, id ASC",
        }
    }
}

impl std::str::FromStr for SortBy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            "name" => Ok(Self::Name),
            "amount" => Ok(Self::Amount),
            "closes_on" => Ok(Self::ClosesOn),
            _ => Err(anyhow::anyhow!("Invalid sort order: {}", s)),
        }
    }
}

/// A sales opportunity, owned by a user, linked to exactly one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub site_id: String,
    pub user_id: String,
    pub account_id: String,
    pub campaign_id: Option<String>,
    pub contact_id: Option<String>,
    pub name: String,
    pub stage: Stage,
    pub access: Access,
    pub source: Option<String>,
    /// Chance of closing, 0..=100.
    pub probability: u32,
    pub amount: f64,
    pub discount: f64,
    pub closes_on: Option<NaiveDate>,
    pub background_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    /// Expected revenue: (amount - discount) weighted by probability.
    pub fn weighted_amount(&self) -> f64 {
        (self.amount - self.discount) * f64::from(self.probability) / 100.0
    }
}

/// The account an opportunity form points at: an existing record by id, or
/// a new one to create (atomically with the opportunity) by name.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccountField {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Account side of a save after validation: exactly one of link-existing
/// or create-new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRef {
    Existing(String),
    New(String),
}

/// Client-supplied attributes for creating or updating an opportunity.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpportunityForm {
    pub name: String,
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub access: Option<Access>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub probability: Option<u32>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub discount: Option<f64>,
    #[serde(default)]
    pub closes_on: Option<NaiveDate>,
    #[serde(default)]
    pub background_info: Option<String>,
    #[serde(default)]
    pub account: AccountField,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub contact_id: Option<String>,
    /// User ids granted access when `access == Shared`.
    #[serde(default)]
    pub shared_with: Vec<String>,
}

/// Empty comment placeholder handed to the detail view alongside the record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommentDraft {
    pub commentable_id: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_round_trips_through_str() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
    }

    #[test]
    fn unknown_stage_is_rejected() {
        assert!("qualified".parse::<Stage>().is_err());
    }

    #[test]
    fn weighted_amount_applies_discount_and_probability() {
        let opp = Opportunity {
            id: "o1".to_string(),
            site_id: "s1".to_string(),
            user_id: "u1".to_string(),
            account_id: "a1".to_string(),
            campaign_id: None,
            contact_id: None,
            name: "Acme deal".to_string(),
            stage: Stage::Negotiation,
            access: Access::Public,
            source: None,
            probability: 50,
            amount: 1000.0,
            discount: 200.0,
            closes_on: None,
            background_info: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!((opp.weighted_amount() - 400.0).abs() < f64::EPSILON);
    }
}
