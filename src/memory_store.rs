use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    models::{Message, Room, RoomFields, User},
    store::{RoomStore, StoreError, StoreResult, UserStore},
};

/// In-process backend. Every room mutation happens under one write lock, which
/// makes it the unit of mutual exclusion for membership changes.
#[derive(Default)]
pub struct MemoryStore {
    rooms: RwLock<HashMap<String, Room>>,
    // insertion order doubles as the tie-breaker for equal `sent_at`
    messages: RwLock<Vec<Message>>,
    users: RwLock<HashMap<String, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_rooms(rooms: &mut [Room]) {
    rooms.sort_by(|a, b| {
        b.member_count
            .cmp(&a.member_count)
            .then(a.created_at.cmp(&b.created_at))
    });
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn insert_room(&self, room: &Room) -> StoreResult<()> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.id) {
            return Err(StoreError::Duplicate(room.id.clone()));
        }
        rooms.insert(room.id.clone(), room.clone());
        Ok(())
    }

    async fn find_room(&self, room_id: &str) -> StoreResult<Option<Room>> {
        Ok(self.rooms.read().await.get(room_id).cloned())
    }

    async fn update_room_fields(&self, room_id: &str, fields: &RoomFields) -> StoreResult<bool> {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return Ok(false);
        };

        room.name = fields.name.clone();
        room.description = fields.description.clone();
        room.visibility = fields.visibility;
        room.passkey = fields.passkey.clone();
        room.avatar_url = fields.avatar_url.clone();
        room.avatar_fallback = fields.avatar_fallback.clone();
        Ok(true)
    }

    async fn delete_room(&self, room_id: &str) -> StoreResult<bool> {
        Ok(self.rooms.write().await.remove(room_id).is_some())
    }

    async fn add_member(&self, room_id: &str, user_id: &str) -> StoreResult<Option<Room>> {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return Ok(None);
        };

        if !room.is_member(user_id) {
            room.member_ids.push(user_id.to_string());
        }
        room.member_count = room.member_ids.len() as u32;
        Ok(Some(room.clone()))
    }

    async fn remove_member(&self, room_id: &str, user_id: &str) -> StoreResult<Option<Room>> {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return Ok(None);
        };

        room.member_ids.retain(|id| id != user_id);
        room.member_count = room.member_ids.len() as u32;
        Ok(Some(room.clone()))
    }

    async fn list_rooms(&self) -> StoreResult<Vec<Room>> {
        let mut rooms: Vec<Room> = self.rooms.read().await.values().cloned().collect();
        sort_rooms(&mut rooms);
        Ok(rooms)
    }

    async fn list_rooms_by_member(&self, user_id: &str) -> StoreResult<Vec<Room>> {
        let mut rooms: Vec<Room> = self
            .rooms
            .read()
            .await
            .values()
            .filter(|room| room.is_member(user_id))
            .cloned()
            .collect();
        sort_rooms(&mut rooms);
        Ok(rooms)
    }

    async fn list_rooms_by_creator(&self, user_id: &str) -> StoreResult<Vec<Room>> {
        let mut rooms: Vec<Room> = self
            .rooms
            .read()
            .await
            .values()
            .filter(|room| room.is_creator(user_id))
            .cloned()
            .collect();
        sort_rooms(&mut rooms);
        Ok(rooms)
    }

    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn find_message(&self, room_id: &str, message_id: &str) -> StoreResult<Option<Message>> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .find(|m| m.id == message_id && m.room_id == room_id)
            .cloned())
    }

    async fn update_message_text(
        &self,
        message_id: &str,
        text: &str,
        edited_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut messages = self.messages.write().await;
        match messages.iter_mut().find(|m| m.id == message_id) {
            Some(message) => {
                message.text = text.to_string();
                message.edited_at = Some(edited_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_messages(&self, room_id: &str) -> StoreResult<Vec<Message>> {
        let mut messages: Vec<Message> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        // stable, so equal timestamps keep insertion order
        messages.sort_by_key(|m| m.sent_at);
        Ok(messages)
    }

    async fn delete_messages_for_room(&self, room_id: &str) -> StoreResult<u64> {
        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|m| m.room_id != room_id);
        Ok((before - messages.len()) as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(user.email.clone()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_user_image(&self, user_id: &str, image: &str) -> StoreResult<bool> {
        match self.users.write().await.get_mut(user_id) {
            Some(user) => {
                user.image = Some(image.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
