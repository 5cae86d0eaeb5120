//! In-memory per-session list state.
//!
//! The session collaborator (cookie handling, expiry) is external; this
//! store only keeps the opportunity list's filter/page/query state between
//! requests. Concurrent requests from one session race on it; last write
//! wins.

use std::collections::HashMap;

use axum::http::HeaderMap;
use tokio::sync::RwLock;

use pipeline_core::SessionState;

pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Default)]
pub struct SessionStore {
    states: RwLock<HashMap<String, SessionState>>,
}

impl SessionStore {
    /// Current state for the session, or a fresh default.
    pub async fn load(&self, key: &str) -> SessionState {
        self.states.read().await.get(key).cloned().unwrap_or_default()
    }

    pub async fn store(&self, key: &str, state: SessionState) {
        self.states.write().await.insert(key.to_string(), state);
    }
}

/// Session key from the request: explicit session header, else the user id
/// (one implicit session per user).
pub fn session_key(headers: &HeaderMap, user_id: &str) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| user_id.to_string(), str::to_string)
}
