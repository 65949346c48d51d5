use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use nlu::{Entities, Intent};
use serde::{Deserialize, Serialize};
use travel::Flight;

/// Where a conversation is in the search-then-book flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    #[default]
    Initial,
    CollectingSearchInfo,
    CollectingDate,
    ShowingResults,
    BookingProcess,
}

impl DialogueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueState::Initial => "initial",
            DialogueState::CollectingSearchInfo => "collecting_search_info",
            DialogueState::CollectingDate => "collecting_date",
            DialogueState::ShowingResults => "showing_results",
            DialogueState::BookingProcess => "booking_process",
        }
    }

    /// States in which a search is underway and follow-up fragments such as
    /// a bare date or airport code continue it.
    pub fn in_search_flow(&self) -> bool {
        matches!(
            self,
            DialogueState::CollectingSearchInfo | DialogueState::CollectingDate | DialogueState::ShowingResults
        )
    }
}

impl fmt::Display for DialogueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_params: Option<Entities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<Flight>>,
}

impl SessionData {
    pub fn has_results(&self) -> bool {
        self.search_results.as_ref().is_some_and(|r| !r.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub state: DialogueState,
    pub data: SessionData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_intent: Option<Intent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            user_id,
            state: DialogueState::Initial,
            data: SessionData::default(),
            previous_intent: None,
            last_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Conversation contexts keyed by session id.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn put(&mut self, session: Session) {
        self.sessions.insert(session.id.clone(), session);
    }

    pub fn remove(&mut self, id: &str) -> Option<Session> {
        self.sessions.remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops sessions untouched for longer than `max_idle`; returns how many.
    pub fn prune_idle(&mut self, max_idle: Duration, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| now - s.updated_at <= max_idle);
        before - self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_idle_keeps_recent_sessions() {
        let now = Utc::now();
        let mut store = SessionStore::new();

        let mut stale = Session::new("stale", None);
        stale.updated_at = now - Duration::hours(3);
        let fresh = Session::new("fresh", Some("u1".into()));
        store.put(stale);
        store.put(fresh);

        assert_eq!(store.prune_idle(Duration::hours(2), now), 1);
        assert!(store.get("stale").is_none());
        assert!(store.get("fresh").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(DialogueState::CollectingDate.to_string(), "collecting_date");
        assert_eq!(
            serde_json::to_value(DialogueState::ShowingResults).unwrap(),
            serde_json::json!("showing_results")
        );
        assert!(DialogueState::ShowingResults.in_search_flow());
        assert!(!DialogueState::BookingProcess.in_search_flow());
        assert!(!DialogueState::Initial.in_search_flow());
    }
}
