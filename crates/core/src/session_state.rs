use serde::{Deserialize, Serialize};

use crate::opportunity::Stage;

/// Ephemeral per-session list state: which page the user is on, what they
/// searched for, and which stages they filtered to.
///
/// Survives across requests within a session until replaced or cleared.
/// Concurrent requests from the same session race on it; last write wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub current_page: u32,
    pub current_query: Option<String>,
    pub stage_filter: Option<Vec<Stage>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self { current_page: 1, current_query: None, stage_filter: None }
    }
}

impl SessionState {
    /// Parses a comma-separated stage list as submitted by the filter
    /// sidebar. Empty input clears the filter; unknown stage names are
    /// dropped.
    pub fn set_stage_filter(&mut self, raw: &str) {
        let stages: Vec<Stage> =
            raw.split(',').filter_map(|s| s.trim().parse().ok()).collect();
        self.stage_filter = if stages.is_empty() { None } else { Some(stages) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_filter_parses_csv() {
        let mut state = SessionState::default();
        state.set_stage_filter("prospecting, negotiation");
        assert_eq!(
            state.stage_filter,
            Some(vec![Stage::Prospecting, Stage::Negotiation])
        );
    }

    #[test]
    fn empty_filter_clears_selection() {
        let mut state = SessionState::default();
        state.set_stage_filter("won");
        state.set_stage_filter("");
        assert_eq!(state.stage_filter, None);
    }

    #[test]
    fn unknown_stages_are_dropped() {
        let mut state = SessionState::default();
        state.set_stage_filter("won,bogus");
        assert_eq!(state.stage_filter, Some(vec![Stage::Won]));
    }
}
