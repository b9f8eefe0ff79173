use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{error, info};
use mongodb::{
    bson::{doc, to_bson, DateTime as BsonDateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions, ReturnDocument},
    Client, Collection, Cursor, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    models::{Message, Room, RoomFields, User, Visibility},
    store::{RoomStore, StoreError, StoreResult, UserStore},
};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoDB {
    pub client: Client,
    pub db: Database,
}

impl MongoDB {
    pub async fn init(uri: &str, db_name: &str) -> StoreResult<Self> {
        let client_options = ClientOptions::parse(uri).await.map_err(backend)?;
        let client = Client::with_options(client_options).map_err(backend)?;
        let db = client.database(db_name);
        let mongodb = MongoDB { client, db };
        mongodb.ensure_indexes().await?;
        info!("Connected to MongoDB database {}", db_name);
        Ok(mongodb)
    }

    async fn ensure_indexes(&self) -> StoreResult<()> {
        let unique = IndexOptions::builder().unique(true).build();
        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique)
                    .build(),
            )
            .await
            .map_err(backend)?;
        self.rooms()
            .create_index(IndexModel::builder().keys(doc! { "member_ids": 1 }).build())
            .await
            .map_err(backend)?;
        self.rooms()
            .create_index(IndexModel::builder().keys(doc! { "creator_id": 1 }).build())
            .await
            .map_err(backend)?;
        self.messages()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "room_id": 1, "sent_at": 1 })
                    .build(),
            )
            .await
            .map_err(backend)?;
        Ok(())
    }

    fn rooms(&self) -> Collection<RoomDocument> {
        self.db.collection::<RoomDocument>("rooms")
    }

    fn messages(&self) -> Collection<MessageDocument> {
        self.db.collection::<MessageDocument>("messages")
    }

    fn users(&self) -> Collection<UserDocument> {
        self.db.collection::<UserDocument>("users")
    }

    async fn find_rooms(&self, filter: Document) -> StoreResult<Vec<Room>> {
        let cursor = self
            .rooms()
            .find(filter)
            .sort(doc! { "member_count": -1, "created_at": 1 })
            .await
            .map_err(backend)?;
        collect(cursor).await
    }

    /// Member-set change and recount in one pipeline update on the room
    /// document, so the count is never written independently of the set.
    async fn mutate_members(&self, room_id: &str, set_expr: Document) -> StoreResult<Option<Room>> {
        let pipeline = vec![
            doc! { "$set": { "member_ids": set_expr } },
            doc! { "$set": { "member_count": { "$size": "$member_ids" } } },
        ];
        let room = self
            .rooms()
            .find_one_and_update(doc! { "_id": room_id }, pipeline)
            .return_document(ReturnDocument::After)
            .await
            .map_err(backend)?;
        Ok(room.map(Room::from))
    }
}

fn backend(err: mongodb::error::Error) -> StoreError {
    error!("MongoDB error: {}", err);
    StoreError::Backend(err.to_string())
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

async fn collect<D, T>(mut cursor: Cursor<D>) -> StoreResult<Vec<T>>
where
    D: DeserializeOwned + Unpin + Send + Sync,
    T: From<D>,
{
    let mut items = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(item) => items.push(T::from(item)),
            Err(err) => return Err(backend(err)),
        }
    }
    Ok(items)
}

fn to_bson_date(at: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(at.timestamp_millis())
}

fn from_bson_date(at: BsonDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(at.timestamp_millis()).unwrap_or_default()
}

// ─── DOCUMENTS ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct RoomDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    description: String,
    visibility: Visibility,
    passkey: Option<String>,
    avatar_url: String,
    avatar_fallback: String,
    creator_id: String,
    member_ids: Vec<String>,
    member_count: i64,
    created_at: BsonDateTime,
}

impl From<&Room> for RoomDocument {
    fn from(room: &Room) -> Self {
        RoomDocument {
            id: room.id.clone(),
            name: room.name.clone(),
            description: room.description.clone(),
            visibility: room.visibility,
            passkey: room.passkey.clone(),
            avatar_url: room.avatar_url.clone(),
            avatar_fallback: room.avatar_fallback.clone(),
            creator_id: room.creator_id.clone(),
            member_ids: room.member_ids.clone(),
            member_count: room.member_count as i64,
            created_at: to_bson_date(room.created_at),
        }
    }
}

impl From<RoomDocument> for Room {
    fn from(doc: RoomDocument) -> Self {
        Room {
            id: doc.id,
            name: doc.name,
            description: doc.description,
            visibility: doc.visibility,
            passkey: doc.passkey,
            avatar_url: doc.avatar_url,
            avatar_fallback: doc.avatar_fallback,
            creator_id: doc.creator_id,
            member_ids: doc.member_ids,
            member_count: doc.member_count.max(0) as u32,
            created_at: from_bson_date(doc.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MessageDocument {
    #[serde(rename = "_id")]
    id: String,
    room_id: String,
    author_id: String,
    author_name: String,
    author_avatar_url: String,
    text: String,
    sent_at: BsonDateTime,
    edited_at: Option<BsonDateTime>,
}

impl From<&Message> for MessageDocument {
    fn from(message: &Message) -> Self {
        MessageDocument {
            id: message.id.clone(),
            room_id: message.room_id.clone(),
            author_id: message.author_id.clone(),
            author_name: message.author_name.clone(),
            author_avatar_url: message.author_avatar_url.clone(),
            text: message.text.clone(),
            sent_at: to_bson_date(message.sent_at),
            edited_at: message.edited_at.map(to_bson_date),
        }
    }
}

impl From<MessageDocument> for Message {
    fn from(doc: MessageDocument) -> Self {
        Message {
            id: doc.id,
            room_id: doc.room_id,
            author_id: doc.author_id,
            author_name: doc.author_name,
            author_avatar_url: doc.author_avatar_url,
            text: doc.text,
            sent_at: from_bson_date(doc.sent_at),
            edited_at: doc.edited_at.map(from_bson_date),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    image: Option<String>,
    password_hash: Option<String>,
    created_at: BsonDateTime,
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        UserDocument {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            image: user.image.clone(),
            password_hash: user.password_hash.clone(),
            created_at: to_bson_date(user.created_at),
        }
    }
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        User {
            id: doc.id,
            name: doc.name,
            email: doc.email,
            image: doc.image,
            password_hash: doc.password_hash,
            created_at: from_bson_date(doc.created_at),
        }
    }
}

// ─── STORES ───────────────────────────────────────────────────────────────────

#[async_trait]
impl RoomStore for MongoDB {
    async fn insert_room(&self, room: &Room) -> StoreResult<()> {
        self.rooms()
            .insert_one(RoomDocument::from(room))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn find_room(&self, room_id: &str) -> StoreResult<Option<Room>> {
        let room = self
            .rooms()
            .find_one(doc! { "_id": room_id })
            .await
            .map_err(backend)?;
        Ok(room.map(Room::from))
    }

    async fn update_room_fields(&self, room_id: &str, fields: &RoomFields) -> StoreResult<bool> {
        let visibility = to_bson(&fields.visibility)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let update = doc! {
            "$set": {
                "name": &fields.name,
                "description": &fields.description,
                "visibility": visibility,
                "passkey": fields.passkey.as_deref(),
                "avatar_url": &fields.avatar_url,
                "avatar_fallback": &fields.avatar_fallback,
            }
        };
        let result = self
            .rooms()
            .update_one(doc! { "_id": room_id }, update)
            .await
            .map_err(backend)?;
        Ok(result.matched_count == 1)
    }

    async fn delete_room(&self, room_id: &str) -> StoreResult<bool> {
        let result = self
            .rooms()
            .delete_one(doc! { "_id": room_id })
            .await
            .map_err(backend)?;
        Ok(result.deleted_count == 1)
    }

    async fn add_member(&self, room_id: &str, user_id: &str) -> StoreResult<Option<Room>> {
        self.mutate_members(room_id, doc! { "$setUnion": ["$member_ids", [user_id]] })
            .await
    }

    async fn remove_member(&self, room_id: &str, user_id: &str) -> StoreResult<Option<Room>> {
        self.mutate_members(room_id, doc! { "$setDifference": ["$member_ids", [user_id]] })
            .await
    }

    async fn list_rooms(&self) -> StoreResult<Vec<Room>> {
        self.find_rooms(doc! {}).await
    }

    async fn list_rooms_by_member(&self, user_id: &str) -> StoreResult<Vec<Room>> {
        self.find_rooms(doc! { "member_ids": user_id }).await
    }

    async fn list_rooms_by_creator(&self, user_id: &str) -> StoreResult<Vec<Room>> {
        self.find_rooms(doc! { "creator_id": user_id }).await
    }

    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        self.messages()
            .insert_one(MessageDocument::from(message))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn find_message(&self, room_id: &str, message_id: &str) -> StoreResult<Option<Message>> {
        let message = self
            .messages()
            .find_one(doc! { "_id": message_id, "room_id": room_id })
            .await
            .map_err(backend)?;
        Ok(message.map(Message::from))
    }

    async fn update_message_text(
        &self,
        message_id: &str,
        text: &str,
        edited_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let update = doc! { "$set": { "text": text, "edited_at": to_bson_date(edited_at) } };
        let result = self
            .messages()
            .update_one(doc! { "_id": message_id }, update)
            .await
            .map_err(backend)?;
        Ok(result.matched_count == 1)
    }

    async fn list_messages(&self, room_id: &str) -> StoreResult<Vec<Message>> {
        let cursor = self
            .messages()
            .find(doc! { "room_id": room_id })
            .sort(doc! { "sent_at": 1, "_id": 1 })
            .await
            .map_err(backend)?;
        collect(cursor).await
    }

    async fn delete_messages_for_room(&self, room_id: &str) -> StoreResult<u64> {
        let result = self
            .messages()
            .delete_many(doc! { "room_id": room_id })
            .await
            .map_err(backend)?;
        Ok(result.deleted_count)
    }
}

#[async_trait]
impl UserStore for MongoDB {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        match self.users().insert_one(UserDocument::from(user)).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(StoreError::Duplicate(user.email.clone())),
            Err(err) => Err(backend(err)),
        }
    }

    async fn find_user_by_id(&self, user_id: &str) -> StoreResult<Option<User>> {
        let user = self
            .users()
            .find_one(doc! { "_id": user_id })
            .await
            .map_err(backend)?;
        Ok(user.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = self
            .users()
            .find_one(doc! { "email": email })
            .await
            .map_err(backend)?;
        Ok(user.map(User::from))
    }

    async fn update_user_image(&self, user_id: &str, image: &str) -> StoreResult<bool> {
        let result = self
            .users()
            .update_one(doc! { "_id": user_id }, doc! { "$set": { "image": image } })
            .await
            .map_err(backend)?;
        Ok(result.matched_count == 1)
    }
}
