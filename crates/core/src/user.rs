use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tenant. Every record belongs to exactly one site and is invisible
/// outside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An authenticated user. Belongs to exactly one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub site_id: String,
    pub username: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn scope(&self) -> Scope {
        Scope { site_id: self.site_id.clone(), user_id: self.id.clone() }
    }
}

/// Tenant + user pair every storage call is restricted by.
///
/// Visibility under a scope: record is on the scope's site AND is public,
/// owned by the scope's user, or explicitly shared with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub site_id: String,
    pub user_id: String,
}
