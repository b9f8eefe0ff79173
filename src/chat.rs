// File: chat.rs

use actix_web::{web, HttpRequest, HttpResponse};
use log::debug;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::authenticated_user;
use crate::error::{ApiError, ApiResult};
use crate::models::message::{EditMessageRequest, SendMessageRequest};
use crate::models::Visibility;
use crate::user_management::current_user_record;

// GET /rooms/{room_id}/messages
// Public rooms can be read by anyone; private rooms only by their members.
pub async fn get_messages(
    req: HttpRequest,
    data: web::Data<AppState>,
    room_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let room = data.ledger.get_room(&room_id).await?;
    if room.visibility == Visibility::Private {
        let current_user = authenticated_user(&req)?;
        if !room.is_member(&current_user) {
            return Err(ApiError::Forbidden("Join this room to read its messages".into()));
        }
    }

    let messages = data.ledger.list_messages(&room.id).await?;
    Ok(HttpResponse::Ok().json(messages))
}

// POST /rooms/{room_id}/messages
pub async fn create_message(
    req: HttpRequest,
    data: web::Data<AppState>,
    room_id: web::Path<String>,
    msg_info: web::Json<SendMessageRequest>,
) -> ApiResult<HttpResponse> {
    let author = current_user_record(&req, &data).await?.as_author();

    let message = data
        .ledger
        .post_message(&room_id, &author, &msg_info.text)
        .await?;
    debug!("Message {} created in room {}", message.id, room_id);

    Ok(HttpResponse::Created().json(message))
}

// PUT /rooms/{room_id}/messages/{message_id}
pub async fn edit_message(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>, // (room_id, message_id)
    msg_info: web::Json<EditMessageRequest>,
) -> ApiResult<HttpResponse> {
    let (room_id, message_id) = path.into_inner();
    let current_user = authenticated_user(&req)?;

    data.ledger
        .edit_message(&room_id, &message_id, &msg_info.text, &current_user)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "status": "Message updated" })))
}
