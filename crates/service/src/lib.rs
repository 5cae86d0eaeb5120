//! Service layer for pipeline-crm
//!
//! Centralizes business logic between the HTTP handlers and storage:
//! opportunity CRUD with account/permission synchronization, the list
//! pipeline (preferences + session state + hook chain), sidebar stage
//! totals, and model validation.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short error vars are idiomatic")]

mod error;
mod hook;
mod opportunity_service;
mod preference_service;
mod validation;


pub use error::{ServiceError, ValidationErrors};
pub use hook::ListQueryHook;
pub use opportunity_service::{EditData, OpportunityService, RelatedRecord};
pub use preference_service::{PreferenceService, PreferenceUpdate};
pub use validation::{account_ref, validate};
