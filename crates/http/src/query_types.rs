//! Request/query types (Deserialize)

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct NewQuery {
    /// Related record the form was opened from: `<kind>_<id>`.
    pub related: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditQuery {
    /// Neighbouring opportunity id for prev/next navigation.
    pub previous: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RedrawRequest {
    pub per_page: Option<u32>,
    pub outline: Option<String>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    /// Comma-separated stage names; empty clears the filter.
    #[serde(default)]
    pub stage: String,
}
