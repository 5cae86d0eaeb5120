//! Pluggable override point for list-query construction.

use pipeline_core::{Opportunity, Scope};
use pipeline_storage::{ListQuery, Page};

/// A query-customization strategy for the opportunity listing.
///
/// The service holds an ordered chain of these; the first hook producing
/// `Some` short-circuits the default query path entirely, receiving the
/// fully-resolved paging/sorting/filter parameters the default path would
/// have used.
pub trait ListQueryHook: Send + Sync {
    fn list(&self, scope: &Scope, query: &ListQuery) -> Option<Page<Opportunity>>;
}
