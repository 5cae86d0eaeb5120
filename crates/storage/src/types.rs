//! Storage types shared across modules

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pipeline_core::{SortBy, Stage};

/// Statistics about storage contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageStats {
    pub site_count: u64,
    pub user_count: u64,
    pub account_count: u64,
    pub campaign_count: u64,
    pub opportunity_count: u64,
}

/// Fully-resolved parameters for one opportunity listing: the outcome of
/// merging user preferences with the session's page/query/filter state.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    pub sort: SortBy,
    /// Restrict to these stages; `None` means no stage filter.
    pub stages: Option<Vec<Stage>>,
    /// Free-text search over opportunity names; `None` or empty means no search.
    pub query: Option<String>,
}

impl ListQuery {
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// One page of a scoped, ordered result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matching rows across all pages.
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u32 {
        if self.total == 0 {
            1
        } else {
            let pages = self.total.div_ceil(u64::from(self.per_page.max(1)));
            u32::try_from(pages).unwrap_or(u32::MAX)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Per-stage opportunity counts for the filter sidebar.
///
/// `other` counts rows whose stored stage string is outside the known
/// stage set (written by older deployments). Computed as one grouped read,
/// so `all == sum(stages) + other` holds exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTotals {
    pub all: u64,
    pub other: u64,
    pub stages: BTreeMap<Stage, u64>,
}

impl StageTotals {
    pub fn named_sum(&self) -> u64 {
        self.stages.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_math() {
        let page = Page::<u8> { items: vec![], total: 12, page: 3, per_page: 5 };
        assert_eq!(page.total_pages(), 3);

        let empty = Page::<u8> { items: vec![], total: 0, page: 1, per_page: 5 };
        assert_eq!(empty.total_pages(), 1);
    }

    #[test]
    fn list_query_offset() {
        let q = ListQuery {
            page: 3,
            per_page: 5,
            sort: SortBy::CreatedAt,
            stages: None,
            query: None,
        };
        assert_eq!(q.offset(), 10);
    }
}
