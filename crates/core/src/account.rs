use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A company an opportunity is sold to. Name is unique per site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub site_id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Marketing campaign an opportunity may originate from.
///
/// Carries a cached summary of its opportunities; the summary is refreshed
/// whenever an opportunity referencing the campaign is created, updated,
/// or destroyed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub site_id: String,
    pub user_id: String,
    pub name: String,
    /// Cached: number of opportunities linked to this campaign.
    pub opportunities_count: u32,
    /// Cached: total amount of won opportunities linked to this campaign.
    pub revenue: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Person at an account; referenced when an opportunity is created from a
/// contact page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub site_id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}
