//! Core domain types for pipeline-crm
//!
//! This crate contains the entity and value types shared across all other
//! crates: opportunities and their pipeline stages, the records they link to
//! (accounts, campaigns, contacts), tenant scoping, user display preferences,
//! and the per-session list state.

mod account;
mod constants;
mod opportunity;
mod prefs;
mod related;
mod session_state;
mod user;

pub use account::*;
pub use constants::*;
pub use opportunity::*;
pub use prefs::*;
pub use related::*;
pub use session_state::*;
pub use user::*;
