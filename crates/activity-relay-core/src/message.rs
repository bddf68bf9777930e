//! Protocol messages.
//!
//! Frames are JSON objects discriminated by a `type` field. Outbound frames
//! carry nothing but the tag; inbound frames carry their body under `data`.

use crate::{ActivityPayload, ActivityRecord, ActivityStats, EventKind};
use serde::{Deserialize, Serialize};

/// Messages sent from the dashboard to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Start receiving activity events.
    #[serde(rename = "SUBSCRIBE_ACTIVITIES")]
    Subscribe,
    /// Stop receiving activity events.
    #[serde(rename = "UNSUBSCRIBE_ACTIVITIES")]
    Unsubscribe,
    /// Ask the relay to resend the initial activity list and stats.
    #[serde(rename = "REQUEST_REFRESH")]
    RequestRefresh,
}

impl ClientMessage {
    /// Serialize to a text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Messages pushed from the relay to the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    NewActivity(ActivityRecord),
    ActivityUpdated(ActivityRecord),
    InitialActivities(Vec<ActivityRecord>),
    ActivityStats(ActivityStats),
    /// A well-formed frame with a discriminant this client does not know.
    Unknown { kind: String },
}

/// Envelope shared by every inbound frame.
#[derive(Serialize, Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl ServerMessage {
    /// Parse a text frame.
    ///
    /// Unrecognized discriminants decode to [`ServerMessage::Unknown`]; only
    /// bodies that are not JSON, lack a `type`, or carry a `data` of the wrong
    /// shape are errors.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let Frame { kind, data } = serde_json::from_str(text).map_err(DecodeError::Envelope)?;
        let body = |source| DecodeError::Body {
            kind: kind.clone(),
            source,
        };

        let message = match kind.as_str() {
            "NEW_ACTIVITY" => ServerMessage::NewActivity(serde_json::from_value(data).map_err(body)?),
            "ACTIVITY_UPDATED" => {
                ServerMessage::ActivityUpdated(serde_json::from_value(data).map_err(body)?)
            }
            "INITIAL_ACTIVITIES" => {
                ServerMessage::InitialActivities(serde_json::from_value(data).map_err(body)?)
            }
            "ACTIVITY_STATS" => {
                ServerMessage::ActivityStats(serde_json::from_value(data).map_err(body)?)
            }
            _ => ServerMessage::Unknown { kind },
        };
        Ok(message)
    }

    /// Serialize to a text frame, as the relay sends it.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let (kind, data) = match self {
            ServerMessage::NewActivity(record) => ("NEW_ACTIVITY", serde_json::to_value(record)?),
            ServerMessage::ActivityUpdated(record) => {
                ("ACTIVITY_UPDATED", serde_json::to_value(record)?)
            }
            ServerMessage::InitialActivities(records) => {
                ("INITIAL_ACTIVITIES", serde_json::to_value(records)?)
            }
            ServerMessage::ActivityStats(stats) => ("ACTIVITY_STATS", serde_json::to_value(stats)?),
            ServerMessage::Unknown { kind } => (kind.as_str(), serde_json::Value::Null),
        };
        serde_json::to_string(&Frame {
            kind: kind.to_string(),
            data,
        })
    }

    /// Split into the `(payload, kind)` pair handed to consumers.
    ///
    /// Returns `None` for [`ServerMessage::Unknown`].
    pub fn into_event(self) -> Option<(ActivityPayload, EventKind)> {
        match self {
            ServerMessage::NewActivity(record) => {
                Some((ActivityPayload::Activity(record), EventKind::New))
            }
            ServerMessage::ActivityUpdated(record) => {
                Some((ActivityPayload::Activity(record), EventKind::Updated))
            }
            ServerMessage::InitialActivities(records) => {
                Some((ActivityPayload::Activities(records), EventKind::Initial))
            }
            ServerMessage::ActivityStats(stats) => {
                Some((ActivityPayload::Stats(stats), EventKind::Stats))
            }
            ServerMessage::Unknown { .. } => None,
        }
    }
}

/// Error parsing an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is not a typed JSON object: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("invalid data for {kind}: {source}")]
    Body {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}
