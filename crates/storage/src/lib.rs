//! SQLite persistence for pipeline-crm.
//!
//! Every finder and mutation takes a [`pipeline_core::Scope`] and only sees
//! rows belonging to that scope's site that the scope's user is allowed to
//! read. Callers never apply tenant conditions themselves.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short closure params are idiomatic")]

mod error;
mod migrations;
mod sqlite;
mod types;

#[cfg(test)]
mod tests;

pub use error::StorageError;
pub use sqlite::Storage;
pub use types::{ListQuery, Page, StageTotals, StorageStats};
