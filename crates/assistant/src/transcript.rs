use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use nlu::{Entities, Intent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::reply::ResponseKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One side of an exchange. Records are never edited, only appended or
/// cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    pub id: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub sender: Sender,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Entities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl ChatRecord {
    pub fn user(session_id: &str, user_id: Option<&str>, message: &str, intent: Intent, entities: Entities) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            user_id: user_id.map(str::to_string),
            sender: Sender::User,
            message: message.to_string(),
            intent: Some(intent),
            entities: Some(entities),
            response_type: None,
            quick_replies: Vec::new(),
            metadata: None,
            timestamp: Utc::now(),
        }
    }

    pub fn bot(
        session_id: &str,
        user_id: Option<&str>,
        message: &str,
        kind: ResponseKind,
        quick_replies: Vec<String>,
        metadata: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            user_id: user_id.map(str::to_string),
            sender: Sender::Bot,
            message: message.to_string(),
            intent: None,
            entities: None,
            response_type: Some(kind),
            quick_replies,
            metadata: Some(metadata),
            timestamp: Utc::now(),
        }
    }
}

/// Selects records by account when signed in, else by session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner<'a> {
    User(&'a str),
    Session(&'a str),
}

impl Owner<'_> {
    fn owns(&self, record: &ChatRecord) -> bool {
        match self {
            Owner::User(id) => record.user_id.as_deref() == Some(*id),
            Owner::Session(id) => record.session_id == *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowStep {
    pub sender: Sender,
    pub intent: Option<Intent>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub session_id: String,
    pub total_messages: usize,
    pub user_messages: usize,
    pub bot_messages: usize,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub intents: Vec<Intent>,
    /// Distinct values seen per entity field.
    pub entities: BTreeMap<String, Vec<Value>>,
    pub conversation_flow: Vec<FlowStep>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1d")]
    Day,
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl TimeRange {
    pub fn duration(&self) -> Duration {
        match self {
            TimeRange::Day => Duration::days(1),
            TimeRange::Week => Duration::days(7),
            TimeRange::Month => Duration::days(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub sender: Sender,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentCount {
    pub intent: Intent,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnalytics {
    pub messages_by_day: Vec<DayCount>,
    pub intent_distribution: Vec<IntentCount>,
    pub time_range: TimeRange,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Transcript of every chat exchange, oldest first.
#[derive(Debug, Default)]
pub struct ChatLog {
    records: RwLock<Vec<ChatRecord>>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, records: impl IntoIterator<Item = ChatRecord>) {
        self.records.write().await.extend(records);
    }

    /// The most recent `limit` records, oldest first.
    pub async fn history(&self, owner: Owner<'_>, limit: usize) -> Vec<ChatRecord> {
        let records = self.records.read().await;
        let mut recent: Vec<ChatRecord> = records
            .iter()
            .rev()
            .filter(|r| owner.owns(r))
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        recent
    }

    /// Drops records older than `cutoff`, then the oldest ones beyond
    /// `max_records`. Returns how many went.
    pub async fn prune(&self, cutoff: DateTime<Utc>, max_records: usize) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.timestamp >= cutoff);
        if records.len() > max_records {
            let excess = records.len() - max_records;
            records.drain(..excess);
        }
        before - records.len()
    }

    pub async fn clear(&self, owner: Owner<'_>) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !owner.owns(r));
        before - records.len()
    }

    pub async fn summary(&self, session_id: &str) -> Option<ConversationSummary> {
        let records = self.records.read().await;
        let messages: Vec<&ChatRecord> = records.iter().filter(|r| r.session_id == session_id).collect();
        let first = messages.first()?;
        let last = messages.last()?;

        let mut intents = Vec::new();
        let mut entities: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for record in &messages {
            if let Some(intent) = record.intent {
                if !intents.contains(&intent) {
                    intents.push(intent);
                }
            }
            let fields = record
                .entities
                .as_ref()
                .and_then(|e| serde_json::to_value(e).ok())
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default();
            for (key, value) in fields {
                let seen = entities.entry(key).or_default();
                if !seen.contains(&value) {
                    seen.push(value);
                }
            }
        }

        Some(ConversationSummary {
            session_id: session_id.to_string(),
            total_messages: messages.len(),
            user_messages: messages.iter().filter(|r| r.sender == Sender::User).count(),
            bot_messages: messages.iter().filter(|r| r.sender == Sender::Bot).count(),
            start_time: first.timestamp,
            last_activity: last.timestamp,
            intents,
            entities,
            conversation_flow: messages
                .iter()
                .map(|r| FlowStep { sender: r.sender, intent: r.intent, timestamp: r.timestamp })
                .collect(),
        })
    }

    /// Message counts per day and sender plus the intent distribution over
    /// `range`, for one account or for everyone.
    pub async fn analytics(&self, user_id: Option<&str>, range: TimeRange, now: DateTime<Utc>) -> ChatAnalytics {
        let start = now - range.duration();
        let records = self.records.read().await;
        let in_scope = records
            .iter()
            .filter(|r| r.timestamp >= start)
            .filter(|r| user_id.map_or(true, |u| r.user_id.as_deref() == Some(u)));

        let mut by_day: BTreeMap<(NaiveDate, Sender), usize> = BTreeMap::new();
        let mut by_intent: HashMap<Intent, usize> = HashMap::new();
        for record in in_scope {
            *by_day.entry((record.timestamp.date_naive(), record.sender)).or_default() += 1;
            if let Some(intent) = record.intent {
                *by_intent.entry(intent).or_default() += 1;
            }
        }

        let mut intent_distribution: Vec<IntentCount> = by_intent
            .into_iter()
            .map(|(intent, count)| IntentCount { intent, count })
            .collect();
        intent_distribution.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.intent.as_str().cmp(b.intent.as_str())));

        ChatAnalytics {
            messages_by_day: by_day
                .into_iter()
                .map(|((date, sender), count)| DayCount { date, sender, count })
                .collect(),
            intent_distribution,
            time_range: range,
            start_date: start,
            end_date: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(session: &str, user: Option<&str>, text: &str, intent: Intent) -> [ChatRecord; 2] {
        [
            ChatRecord::user(session, user, text, intent, Entities::default()),
            ChatRecord::bot(session, user, "ok", ResponseKind::Text, Vec::new(), Value::Null),
        ]
    }

    #[tokio::test]
    async fn test_history_is_chronological_and_limited() {
        let log = ChatLog::new();
        log.append(exchange("s1", None, "hi", Intent::Greeting)).await;
        log.append(exchange("s1", None, "help", Intent::Help)).await;
        log.append(exchange("s2", None, "bye", Intent::Goodbye)).await;

        let recent = log.history(Owner::Session("s1"), 3).await;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].sender, Sender::Bot);
        assert_eq!(recent[1].message, "help");
        assert!(recent.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_prune_by_age_then_size() {
        let log = ChatLog::new();
        let mut stale = exchange("old", None, "hi", Intent::Greeting);
        for record in stale.iter_mut() {
            record.timestamp = Utc::now() - Duration::days(40);
        }
        log.append(stale).await;
        log.append(exchange("s1", None, "hi", Intent::Greeting)).await;
        log.append(exchange("s2", None, "help", Intent::Help)).await;

        let cutoff = Utc::now() - Duration::days(30);
        assert_eq!(log.prune(cutoff, 3).await, 3);
        let kept = log.history(Owner::Session("s1"), 10).await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].sender, Sender::Bot);
        assert_eq!(log.history(Owner::Session("s2"), 10).await.len(), 2);
        assert_eq!(log.prune(cutoff, 3).await, 0);
    }

    #[tokio::test]
    async fn test_clear_by_owner() {
        let log = ChatLog::new();
        log.append(exchange("s1", Some("u1"), "hi", Intent::Greeting)).await;
        log.append(exchange("s2", Some("u1"), "hi", Intent::Greeting)).await;
        log.append(exchange("s3", None, "hi", Intent::Greeting)).await;

        assert_eq!(log.clear(Owner::User("u1")).await, 4);
        assert_eq!(log.clear(Owner::Session("s3")).await, 2);
        assert!(log.history(Owner::Session("s3"), 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_summary_collects_intents_and_entities() {
        let log = ChatLog::new();
        let entities = Entities { origin: Some("JFK".into()), ..Default::default() };
        log.append([ChatRecord::user("s1", None, "from JFK", Intent::SearchFlights, entities.clone())]).await;
        log.append([ChatRecord::user("s1", None, "JFK again", Intent::SearchFlights, entities)]).await;
        log.append(exchange("s1", None, "thanks", Intent::Goodbye)).await;

        let summary = log.summary("s1").await.unwrap();
        assert_eq!(summary.total_messages, 4);
        assert_eq!(summary.user_messages, 3);
        assert_eq!(summary.bot_messages, 1);
        assert_eq!(summary.intents, vec![Intent::SearchFlights, Intent::Goodbye]);
        assert_eq!(summary.entities["origin"], vec![Value::from("JFK")]);
        assert_eq!(summary.conversation_flow.len(), 4);

        assert!(log.summary("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_analytics_window() {
        let log = ChatLog::new();
        let mut old = ChatRecord::user("s1", None, "hi", Intent::Greeting, Entities::default());
        old.timestamp = Utc::now() - Duration::days(10);
        log.append([old]).await;
        log.append(exchange("s1", None, "hi", Intent::Greeting)).await;
        log.append(exchange("s1", None, "help", Intent::Help)).await;
        log.append(exchange("s1", None, "hello", Intent::Greeting)).await;

        let week = log.analytics(None, TimeRange::Week, Utc::now()).await;
        let users: usize = week
            .messages_by_day
            .iter()
            .filter(|d| d.sender == Sender::User)
            .map(|d| d.count)
            .sum();
        assert_eq!(users, 3);
        assert_eq!(week.intent_distribution[0], IntentCount { intent: Intent::Greeting, count: 2 });

        let month = log.analytics(None, TimeRange::Month, Utc::now()).await;
        assert_eq!(month.intent_distribution[0].count, 3);
    }
}
