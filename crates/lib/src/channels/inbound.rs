//! Inbound callback event: the JSON body VK POSTs to the callback endpoint.

use serde::de::{Deserializer, Error as _};
use serde::Deserialize;
use serde_json::Value;

pub const CONFIRMATION: &str = "confirmation";
pub const MESSAGE_NEW: &str = "message_new";
pub const MESSAGE_REPLY: &str = "message_reply";

/// The callback body could not be classified or lacks fields its type requires.
#[derive(Debug, thiserror::Error)]
pub enum MalformedEvent {
    #[error("invalid callback body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message_new event without object")]
    MissingObject,
    #[error("message_new object has neither peer_id nor user_id")]
    MissingDestination,
}

/// Raw envelope as sent by the platform.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    typ: String,
    #[serde(default)]
    object: Option<Value>,
    #[serde(default)]
    group_id: Option<i64>,
    #[serde(default)]
    secret: Option<String>,
}

/// Classified event, one variant per handled `type`.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Confirmation,
    MessageNew(EventObject),
    MessageReply(Option<Value>),
    Other(String),
}

impl InboundEvent {
    /// The `type` string this event was classified from.
    pub fn type_name(&self) -> &str {
        match self {
            InboundEvent::Confirmation => CONFIRMATION,
            InboundEvent::MessageNew(_) => MESSAGE_NEW,
            InboundEvent::MessageReply(_) => MESSAGE_REPLY,
            InboundEvent::Other(t) => t,
        }
    }
}

/// A parsed callback: the event plus envelope fields used for verification.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    pub event: InboundEvent,
    pub group_id: Option<i64>,
    pub secret: Option<String>,
}

impl CallbackEvent {
    pub fn from_slice(body: &[u8]) -> Result<Self, MalformedEvent> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, MalformedEvent> {
        let envelope: Envelope = serde_json::from_value(value)?;
        let event = match envelope.typ.as_str() {
            CONFIRMATION => InboundEvent::Confirmation,
            MESSAGE_NEW => {
                let object = envelope.object.ok_or(MalformedEvent::MissingObject)?;
                InboundEvent::MessageNew(EventObject::from_value(object)?)
            }
            MESSAGE_REPLY => InboundEvent::MessageReply(envelope.object),
            _ => InboundEvent::Other(envelope.typ),
        };
        Ok(Self {
            event,
            group_id: envelope.group_id,
            secret: envelope.secret,
        })
    }
}

/// Fields of a `message_new` object that the reply path reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventObject {
    #[serde(default, deserialize_with = "optional_id")]
    pub peer_id: Option<i64>,
    #[serde(default, deserialize_with = "optional_id")]
    pub user_id: Option<i64>,
    pub text: String,
    pub from_id: i64,
    #[serde(default)]
    pub conversation_message_id: Option<i64>,
}

impl EventObject {
    /// Accepts the flat layout and the `{ "message": {...}, "client_info": {...} }` layout of newer API versions.
    pub fn from_value(object: Value) -> Result<Self, MalformedEvent> {
        let object = match object {
            Value::Object(mut map) if map.get("message").is_some_and(Value::is_object) => {
                map.remove("message").unwrap_or(Value::Null)
            }
            other => other,
        };
        let parsed: EventObject = serde_json::from_value(object)?;
        if parsed.destination_id().is_none() {
            return Err(MalformedEvent::MissingDestination);
        }
        Ok(parsed)
    }

    /// Conversation to reply to: peer_id, falling back to user_id.
    pub fn destination_id(&self) -> Option<i64> {
        self.peer_id.or(self.user_id)
    }
}

/// Id that may be absent, null, or empty; all three mean "no value".
fn optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("id out of range: {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
        Some(Value::Array(a)) if a.is_empty() => Ok(None),
        Some(Value::Object(o)) if o.is_empty() => Ok(None),
        Some(other) => Err(D::Error::custom(format!("invalid id: {}", other))),
    }
}
