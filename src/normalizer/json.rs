//! JSON statuses, shared by the REST JSON endpoints and the stream.

use serde::Deserialize;
use serde_json::Value;

use crate::app::Result;
use crate::domain::{Author, Status};

/// What a single JSON object on the stream turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Initial friend id list sent when a user stream opens.
    Friends(usize),
    Event(String),
    Delete,
    Disconnect(Option<String>),
    Status(Box<Status>),
    Unknown,
}

impl StreamMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamMessage::Friends(_) => "friends",
            StreamMessage::Event(_) => "event",
            StreamMessage::Delete => "delete",
            StreamMessage::Disconnect(_) => "disconnect",
            StreamMessage::Status(_) => "status",
            StreamMessage::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUser {
    id: Option<u64>,
    id_str: Option<String>,
    name: Option<String>,
    screen_name: Option<String>,
    profile_image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStatus {
    id: Option<u64>,
    id_str: Option<String>,
    created_at: Option<String>,
    text: Option<String>,
    source: Option<String>,
    user: Option<RawUser>,
    retweeted_status: Option<Box<RawStatus>>,
}

fn pick_id(id_str: Option<String>, id: Option<u64>) -> String {
    id_str
        .or_else(|| id.map(|n| n.to_string()))
        .unwrap_or_default()
}

impl From<RawUser> for Author {
    fn from(raw: RawUser) -> Self {
        Author {
            id: pick_id(raw.id_str, raw.id),
            display_name: raw.name,
            screen_name: raw.screen_name.unwrap_or_default(),
            avatar_url: raw.profile_image_url.unwrap_or_default(),
        }
    }
}

impl From<RawStatus> for Status {
    fn from(raw: RawStatus) -> Self {
        Status {
            id: pick_id(raw.id_str, raw.id),
            created_at: raw.created_at.unwrap_or_default(),
            text: raw.text.unwrap_or_default(),
            source: raw.source.unwrap_or_default(),
            author: raw.user.map(Author::from).unwrap_or_default(),
            retweeted: raw.retweeted_status.map(|inner| Box::new(Status::from(*inner))),
        }
    }
}

/// A REST JSON timeline: an array of statuses, newest first. One bad element
/// fails the whole batch.
pub fn parse_statuses(body: &[u8]) -> Result<Vec<Status>> {
    let raw: Vec<RawStatus> = serde_json::from_slice(body)?;
    Ok(raw.into_iter().map(Status::from).collect())
}

/// Classify one complete JSON value. The checks run in a fixed priority
/// order, so an object carrying both `event` and `user` is an event.
pub fn classify(value: Value) -> Result<StreamMessage> {
    let Value::Object(map) = &value else {
        return Ok(StreamMessage::Unknown);
    };

    if let Some(friends) = map.get("friends") {
        let count = friends.as_array().map(Vec::len).unwrap_or(0);
        return Ok(StreamMessage::Friends(count));
    }

    if let Some(event) = map.get("event") {
        let name = event.as_str().unwrap_or_default().to_string();
        return Ok(StreamMessage::Event(name));
    }

    if map.contains_key("delete") {
        return Ok(StreamMessage::Delete);
    }

    if let Some(disconnect) = map.get("disconnect") {
        let reason = disconnect
            .get("reason")
            .and_then(Value::as_str)
            .map(String::from);
        return Ok(StreamMessage::Disconnect(reason));
    }

    if map.get("user").is_some_and(Value::is_object) {
        let raw: RawStatus = serde_json::from_value(value)?;
        return Ok(StreamMessage::Status(Box::new(raw.into())));
    }

    Ok(StreamMessage::Unknown)
}
