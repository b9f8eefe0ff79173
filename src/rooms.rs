// rooms.rs

use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::authenticated_user;
use crate::error::{ApiError, ApiResult};
use crate::models::{Room, RoomDraft, RoomUpdate, RoomView};
use crate::user_management::current_user_record;

#[derive(Debug, Default, Deserialize)]
pub struct JoinRequest {
    pub passkey: Option<String>,
}

fn views(rooms: Vec<Room>, viewer: Option<&str>) -> Vec<RoomView> {
    rooms
        .into_iter()
        .map(|room| RoomView::for_viewer(room, viewer))
        .collect()
}

/// The caller may only list their own rooms.
fn ensure_self(req: &HttpRequest, user_id: &str) -> ApiResult<String> {
    let current_user = authenticated_user(req)?;
    if current_user != user_id {
        return Err(ApiError::Forbidden("Cannot access other user's rooms".into()));
    }
    Ok(current_user)
}

// GET /rooms
pub async fn list_rooms(req: HttpRequest, data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let viewer = authenticated_user(&req).ok();
    let rooms = data.ledger.list_rooms().await?;
    Ok(HttpResponse::Ok().json(views(rooms, viewer.as_deref())))
}

// POST /rooms
pub async fn create_room(
    req: HttpRequest,
    data: web::Data<AppState>,
    draft: web::Json<RoomDraft>,
) -> ApiResult<HttpResponse> {
    let creator = current_user_record(&req, &data).await?;
    debug!("create_room called by {} for {:?}", creator.id, draft.name);

    let room = data.ledger.create_room(draft.into_inner(), &creator.id).await?;
    Ok(HttpResponse::Created().json(RoomView::for_viewer(room, Some(&creator.id))))
}

// GET /rooms/member/{user_id}
pub async fn list_member_rooms(
    req: HttpRequest,
    data: web::Data<AppState>,
    user_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let current_user = ensure_self(&req, &user_id)?;
    let rooms = data.ledger.list_rooms_by_member(&current_user).await?;
    Ok(HttpResponse::Ok().json(views(rooms, Some(&current_user))))
}

// GET /rooms/creator/{user_id}
pub async fn list_created_rooms(
    req: HttpRequest,
    data: web::Data<AppState>,
    user_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let current_user = ensure_self(&req, &user_id)?;
    let rooms = data.ledger.list_rooms_by_creator(&current_user).await?;
    Ok(HttpResponse::Ok().json(views(rooms, Some(&current_user))))
}

// GET /rooms/{room_id}
pub async fn get_room(
    req: HttpRequest,
    data: web::Data<AppState>,
    room_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let viewer = authenticated_user(&req).ok();
    let room = data.ledger.get_room(&room_id).await?;
    Ok(HttpResponse::Ok().json(RoomView::for_viewer(room, viewer.as_deref())))
}

// PUT /rooms/{room_id}
pub async fn update_room(
    req: HttpRequest,
    data: web::Data<AppState>,
    room_id: web::Path<String>,
    updates: web::Json<RoomUpdate>,
) -> ApiResult<HttpResponse> {
    let current_user = authenticated_user(&req)?;
    data.ledger
        .update_room(&room_id, updates.into_inner(), &current_user)
        .await?;

    let room = data.ledger.get_room(&room_id).await?;
    Ok(HttpResponse::Ok().json(RoomView::for_viewer(room, Some(&current_user))))
}

// DELETE /rooms/{room_id}
pub async fn delete_room(
    req: HttpRequest,
    data: web::Data<AppState>,
    room_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let current_user = authenticated_user(&req)?;
    data.ledger.delete_room(&room_id, &current_user).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "Room deleted" })))
}

// POST /rooms/{room_id}/join
// Private rooms are gated on the passkey here; the ledger's join itself does
// not look at it. Existing members skip the gate.
pub async fn join_room(
    req: HttpRequest,
    data: web::Data<AppState>,
    room_id: web::Path<String>,
    body: Option<web::Json<JoinRequest>>,
) -> ApiResult<HttpResponse> {
    let current_user = current_user_record(&req, &data).await?.id;
    let passkey = body.and_then(|b| b.into_inner().passkey);

    let room = data.ledger.get_room(&room_id).await?;
    if !room.is_member(&current_user) {
        if !room.admits(passkey.as_deref()) {
            warn!("User {} gave a wrong passkey for room {}", current_user, room.id);
            return Err(ApiError::Forbidden("Incorrect passkey. Please try again.".into()));
        }
        data.ledger.join(&room.id, &current_user).await?;
    }

    let room = data.ledger.get_room(&room_id).await?;
    Ok(HttpResponse::Ok().json(RoomView::for_viewer(room, Some(&current_user))))
}

// POST /rooms/{room_id}/leave
pub async fn leave_room(
    req: HttpRequest,
    data: web::Data<AppState>,
    room_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let current_user = authenticated_user(&req)?;
    data.ledger.leave(&room_id, &current_user).await?;

    let room = data.ledger.get_room(&room_id).await?;
    Ok(HttpResponse::Ok().json(RoomView::for_viewer(room, Some(&current_user))))
}
