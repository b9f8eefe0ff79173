use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum number of characters a private room passkey must carry.
pub const MIN_PASSKEY_LEN: usize = 8;

/// Placeholder initials for a room without a usable name.
pub const FALLBACK_INITIALS: &str = "NA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// A named chat channel and its membership set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    /// Present and non-empty only for private rooms.
    pub passkey: Option<String>,
    pub avatar_url: String,
    pub avatar_fallback: String,
    pub creator_id: String,
    pub member_ids: Vec<String>,
    /// Always `member_ids.len()` once a mutation completes.
    pub member_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|id| id == user_id)
    }

    pub fn is_creator(&self, user_id: &str) -> bool {
        self.creator_id == user_id
    }

    /// Passkey gate applied before a join. Public rooms admit everyone;
    /// private rooms need an exact match with the stored passkey.
    pub fn admits(&self, passkey: Option<&str>) -> bool {
        match self.visibility {
            Visibility::Public => true,
            Visibility::Private => match (self.passkey.as_deref(), passkey) {
                (Some(stored), Some(given)) => !stored.is_empty() && stored == given,
                _ => false,
            },
        }
    }
}

/// Fields supplied when creating a room.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomDraft {
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub passkey: Option<String>,
    #[serde(default)]
    pub avatar_url: String,
}

/// Partial update of a room; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    pub passkey: Option<String>,
    pub avatar_url: Option<String>,
}

/// The mutable fields of a room, written back as one unit by `updateRoom`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomFields {
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub passkey: Option<String>,
    pub avatar_url: String,
    pub avatar_fallback: String,
}

/// Room as rendered for a particular viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub has_passkey: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passkey: Option<String>,
    pub avatar_url: String,
    pub avatar_fallback: String,
    pub creator_id: String,
    pub member_ids: Vec<String>,
    pub member_count: u32,
    pub created_at: DateTime<Utc>,
    pub is_joined: bool,
    pub is_creator: bool,
}

impl RoomView {
    /// Only the creator gets to see the passkey back.
    pub fn for_viewer(room: Room, viewer_id: Option<&str>) -> Self {
        let is_joined = viewer_id.is_some_and(|id| room.is_member(id));
        let is_creator = viewer_id.is_some_and(|id| room.is_creator(id));
        let has_passkey = room.passkey.as_deref().is_some_and(|p| !p.is_empty());

        RoomView {
            id: room.id,
            name: room.name,
            description: room.description,
            visibility: room.visibility,
            has_passkey,
            passkey: if is_creator { room.passkey } else { None },
            avatar_url: room.avatar_url,
            avatar_fallback: room.avatar_fallback,
            creator_id: room.creator_id,
            member_ids: room.member_ids,
            member_count: room.member_count,
            created_at: room.created_at,
            is_joined,
            is_creator,
        }
    }
}

/// Initials shown in place of a missing room avatar: the first letters of the
/// first two words, or the first letter of a single word.
pub fn avatar_fallback(name: &str) -> String {
    let mut words = name.split_whitespace();

    let initial = |word: &str| word.chars().next().map(|c| c.to_uppercase().collect::<String>());

    match (words.next(), words.next()) {
        (Some(first), Some(second)) => {
            let mut out = initial(first).unwrap_or_default();
            out.push_str(&initial(second).unwrap_or_default());
            out
        }
        (Some(first), None) => initial(first).unwrap_or_default(),
        _ => FALLBACK_INITIALS.to_string(),
    }
}
