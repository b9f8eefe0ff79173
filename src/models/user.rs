use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::message::Author;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image: Option<String>,

    #[serde(skip_serializing)] // never send password hash in API responses
    pub password_hash: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn as_author(&self) -> Author {
        Author {
            id: self.id.clone(),
            name: self.name.clone(),
            avatar_url: self.image.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateImageRequest {
    pub image: String,
}
