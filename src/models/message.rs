use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single chat utterance, scoped to exactly one room.
///
/// `author_name` and `author_avatar_url` are copied from the author's profile
/// when the message is sent and never refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_avatar_url: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// Snapshot of the posting user taken at send time.
#[derive(Debug, Clone)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub avatar_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub text: String,
}
