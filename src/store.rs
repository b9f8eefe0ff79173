use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Message, Room, RoomFields, User};

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam for rooms and their messages.
///
/// `add_member` and `remove_member` must be atomic per room: the member set is
/// changed and `member_count` is recomputed from it in the same unit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn insert_room(&self, room: &Room) -> StoreResult<()>;

    async fn find_room(&self, room_id: &str) -> StoreResult<Option<Room>>;

    /// Returns false when no room matched.
    async fn update_room_fields(&self, room_id: &str, fields: &RoomFields) -> StoreResult<bool>;

    async fn delete_room(&self, room_id: &str) -> StoreResult<bool>;

    /// Set-add of `user_id`; returns the room as it is after the mutation.
    async fn add_member(&self, room_id: &str, user_id: &str) -> StoreResult<Option<Room>>;

    /// Set-remove of `user_id`; returns the room as it is after the mutation.
    async fn remove_member(&self, room_id: &str, user_id: &str) -> StoreResult<Option<Room>>;

    /// All rooms, most members first.
    async fn list_rooms(&self) -> StoreResult<Vec<Room>>;

    async fn list_rooms_by_member(&self, user_id: &str) -> StoreResult<Vec<Room>>;

    async fn list_rooms_by_creator(&self, user_id: &str) -> StoreResult<Vec<Room>>;

    async fn insert_message(&self, message: &Message) -> StoreResult<()>;

    async fn find_message(&self, room_id: &str, message_id: &str) -> StoreResult<Option<Message>>;

    async fn update_message_text(
        &self,
        message_id: &str,
        text: &str,
        edited_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Messages of a room ordered by `sent_at` ascending.
    async fn list_messages(&self, room_id: &str) -> StoreResult<Vec<Message>>;

    /// Returns the number of messages removed.
    async fn delete_messages_for_room(&self, room_id: &str) -> StoreResult<u64>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn find_user_by_id(&self, user_id: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn update_user_image(&self, user_id: &str, image: &str) -> StoreResult<bool>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Internal DB error: {0}")]
    Backend(String),
    #[error("duplicate key: {0}")]
    Duplicate(String),
}
