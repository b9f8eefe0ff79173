use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{
        room::{avatar_fallback, MIN_PASSKEY_LEN},
        Author, Message, Room, RoomDraft, RoomFields, RoomUpdate, Visibility,
    },
    store::{RoomStore, StoreError},
};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// How long after sending a message its author may still change it.
pub const EDIT_WINDOW_MINUTES: i64 = 5;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Permission(String),
    #[error("Messages can only be edited within 5 minutes of sending")]
    EditWindowExpired,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Owns rooms and their messages and keeps them consistent:
/// `member_count` always equals the member set's size, the creator stays a
/// member, only members post, and deleting a room takes its messages along.
pub struct Ledger {
    store: Arc<dyn RoomStore>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn RoomStore>, clock: Arc<dyn Clock>) -> Self {
        Ledger { store, clock }
    }

    pub async fn create_room(&self, draft: RoomDraft, creator_id: &str) -> LedgerResult<Room> {
        let name = required("Room name", &draft.name)?;
        let description = required("Room description", &draft.description)?;
        let passkey = checked_passkey(draft.visibility, draft.passkey)?;

        let room = Room {
            id: Uuid::new_v4().to_string(),
            avatar_fallback: avatar_fallback(&name),
            name,
            description,
            visibility: draft.visibility,
            passkey,
            avatar_url: draft.avatar_url,
            creator_id: creator_id.to_string(),
            member_ids: vec![creator_id.to_string()],
            member_count: 1,
            created_at: self.clock.now(),
        };

        self.store.insert_room(&room).await?;
        info!("Room {} created by {}", room.id, creator_id);

        Ok(room)
    }

    pub async fn update_room(
        &self,
        room_id: &str,
        updates: RoomUpdate,
        requester_id: &str,
    ) -> LedgerResult<()> {
        let room = self.room(room_id).await?;
        if !room.is_creator(requester_id) {
            warn!("User {} tried to update room {} they did not create", requester_id, room_id);
            return Err(LedgerError::Permission(
                "Only the room creator can edit this room".into(),
            ));
        }

        let name = match updates.name {
            Some(name) => required("Room name", &name)?,
            None => room.name,
        };
        let description = match updates.description {
            Some(description) => required("Room description", &description)?,
            None => room.description,
        };
        let visibility = updates.visibility.unwrap_or(room.visibility);
        let passkey = checked_passkey(visibility, updates.passkey.or(room.passkey))?;

        let fields = RoomFields {
            avatar_fallback: avatar_fallback(&name),
            name,
            description,
            visibility,
            passkey,
            avatar_url: updates.avatar_url.unwrap_or(room.avatar_url),
        };

        if !self.store.update_room_fields(room_id, &fields).await? {
            return Err(LedgerError::NotFound("Room"));
        }
        info!("Room {} updated", room_id);

        Ok(())
    }

    /// Messages go first, then the room, then a second sweep for anything
    /// posted in between. Leftovers after the sweep are logged, not fatal.
    pub async fn delete_room(&self, room_id: &str, requester_id: &str) -> LedgerResult<()> {
        let room = self.room(room_id).await?;
        if !room.is_creator(requester_id) {
            warn!("User {} tried to delete room {} they did not create", requester_id, room_id);
            return Err(LedgerError::Permission(
                "Only the room creator can delete this room".into(),
            ));
        }

        let removed = self.store.delete_messages_for_room(room_id).await?;
        debug!("Deleted {} messages of room {}", removed, room_id);

        if !self.store.delete_room(room_id).await? {
            return Err(LedgerError::NotFound("Room"));
        }

        match self.store.delete_messages_for_room(room_id).await {
            Ok(0) => {}
            Ok(orphans) => warn!("Swept {} late messages of deleted room {}", orphans, room_id),
            Err(err) => error!("Cleanup of deleted room {} failed: {}", room_id, err),
        }
        info!("Room {} deleted by {}", room_id, requester_id);

        Ok(())
    }

    /// Passkey-agnostic: callers gate private rooms before invoking this.
    pub async fn join(&self, room_id: &str, user_id: &str) -> LedgerResult<()> {
        let room = self
            .store
            .add_member(room_id, user_id)
            .await?
            .ok_or(LedgerError::NotFound("Room"))?;
        info!("User {} in room {} ({} members)", user_id, room_id, room.member_count);

        Ok(())
    }

    pub async fn leave(&self, room_id: &str, user_id: &str) -> LedgerResult<()> {
        let room = self.room(room_id).await?;
        if room.is_creator(user_id) {
            return Err(LedgerError::Permission(
                "The room creator cannot leave; delete the room instead".into(),
            ));
        }
        if !room.is_member(user_id) {
            return Ok(());
        }

        let room = self
            .store
            .remove_member(room_id, user_id)
            .await?
            .ok_or(LedgerError::NotFound("Room"))?;
        info!("User {} left room {} ({} members)", user_id, room_id, room.member_count);

        Ok(())
    }

    pub async fn post_message(
        &self,
        room_id: &str,
        author: &Author,
        text: &str,
    ) -> LedgerResult<Message> {
        let room = self.room(room_id).await?;
        let text = required("Message", text)?;
        if !room.is_member(&author.id) {
            return Err(LedgerError::Permission(
                "You must join this room to send messages".into(),
            ));
        }

        let message = Message {
            id: Uuid::new_v4().to_string(),
            room_id: room.id,
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            author_avatar_url: author.avatar_url.clone(),
            text,
            sent_at: self.clock.now(),
            edited_at: None,
        };

        self.store.insert_message(&message).await?;
        debug!("Message {} posted to room {}", message.id, room_id);

        Ok(message)
    }

    pub async fn edit_message(
        &self,
        room_id: &str,
        message_id: &str,
        new_text: &str,
        requester_id: &str,
    ) -> LedgerResult<()> {
        self.room(room_id).await?;
        let message = self
            .store
            .find_message(room_id, message_id)
            .await?
            .ok_or(LedgerError::NotFound("Message"))?;

        if message.author_id != requester_id {
            return Err(LedgerError::Permission(
                "Only the author can edit this message".into(),
            ));
        }

        let now = self.clock.now();
        if now - message.sent_at >= Duration::minutes(EDIT_WINDOW_MINUTES) {
            return Err(LedgerError::EditWindowExpired);
        }

        let text = required("Message", new_text)?;
        if !self.store.update_message_text(message_id, &text, now).await? {
            return Err(LedgerError::NotFound("Message"));
        }

        Ok(())
    }

    pub async fn list_messages(&self, room_id: &str) -> LedgerResult<Vec<Message>> {
        self.room(room_id).await?;
        Ok(self.store.list_messages(room_id).await?)
    }

    pub async fn get_room(&self, room_id: &str) -> LedgerResult<Room> {
        self.room(room_id).await
    }

    pub async fn list_rooms(&self) -> LedgerResult<Vec<Room>> {
        Ok(self.store.list_rooms().await?)
    }

    pub async fn list_rooms_by_member(&self, user_id: &str) -> LedgerResult<Vec<Room>> {
        Ok(self.store.list_rooms_by_member(user_id).await?)
    }

    pub async fn list_rooms_by_creator(&self, user_id: &str) -> LedgerResult<Vec<Room>> {
        Ok(self.store.list_rooms_by_creator(user_id).await?)
    }

    async fn room(&self, room_id: &str) -> LedgerResult<Room> {
        self.store
            .find_room(room_id)
            .await?
            .ok_or(LedgerError::NotFound("Room"))
    }
}

fn required(what: &str, value: &str) -> LedgerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation(format!("{what} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Public rooms never keep a passkey; private ones need a long enough one.
fn checked_passkey(
    visibility: Visibility,
    passkey: Option<String>,
) -> LedgerResult<Option<String>> {
    match visibility {
        Visibility::Public => Ok(None),
        Visibility::Private => match passkey {
            Some(passkey) if passkey.trim().chars().count() >= MIN_PASSKEY_LEN => Ok(Some(passkey)),
            _ => Err(LedgerError::Validation(format!(
                "Passkey must be at least {MIN_PASSKEY_LEN} characters"
            ))),
        },
    }
}
