//! Activity records and aggregate stats carried by the relay.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A log entry describing an operation a user performed on a domain entity
/// (client, policy, lead, quotation, invoice, ...).
///
/// Only the identifier is required. Fields this type does not model are kept
/// in `extra` so that re-serializing a record loses nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActivityAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Server-formatted timestamp, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ActivityRecord {
    /// A record with only an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action: None,
            entity_type: None,
            entity_id: None,
            entity_name: None,
            user_name: None,
            description: None,
            timestamp: None,
            extra: serde_json::Map::new(),
        }
    }

    /// One-line human summary, e.g. `alice create policy P-100`.
    pub fn summary(&self) -> String {
        if let Some(description) = &self.description {
            return description.clone();
        }
        let who = self.user_name.as_deref().unwrap_or("someone");
        let action = self
            .action
            .map(|a| a.to_string())
            .unwrap_or_else(|| "touched".to_string());
        let what = self.entity_type.as_deref().unwrap_or("record");
        match self.entity_name.as_deref().or(self.entity_id.as_deref()) {
            Some(name) => format!("{who} {action} {what} {name}"),
            None => format!("{who} {action} {what}"),
        }
    }
}

/// Operation recorded by an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Read,
    #[serde(other)]
    Other,
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivityAction::Create => "create",
            ActivityAction::Update => "update",
            ActivityAction::Delete => "delete",
            ActivityAction::Read => "read",
            ActivityAction::Other => "other",
        };
        f.write_str(s)
    }
}

/// Aggregate counters pushed alongside the activity stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub today: u64,
    #[serde(default)]
    pub by_action: BTreeMap<String, u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Normalized classification of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    New,
    Updated,
    Initial,
    Stats,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::New => "new",
            EventKind::Updated => "updated",
            EventKind::Initial => "initial",
            EventKind::Stats => "stats",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of an inbound event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActivityPayload {
    Activity(ActivityRecord),
    Activities(Vec<ActivityRecord>),
    Stats(ActivityStats),
}
