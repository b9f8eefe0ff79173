use actix_web::{web, HttpRequest, HttpResponse};
use log::info;

use crate::app_state::AppState;
use crate::auth::authenticated_user;
use crate::error::{ApiError, ApiResult};
use crate::models::user::UpdateImageRequest;
use crate::models::User;

/// The stored user behind the request's token, `NotFound` when there is none.
pub async fn current_user_record(req: &HttpRequest, data: &AppState) -> ApiResult<User> {
    let current_user = authenticated_user(req)?;
    data.users
        .find_user_by_id(&current_user)
        .await?
        .ok_or(ApiError::NotFound("User"))
}

// GET /users/me
pub async fn get_current_user(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let user = current_user_record(&req, &data).await?;
    Ok(HttpResponse::Ok().json(user))
}

// GET /users/{id}
pub async fn get_user_by_id(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let user = data
        .users
        .find_user_by_id(&path)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(HttpResponse::Ok().json(user))
}

// PUT /users/me/image
// Messages already sent keep the image they were sent with.
pub async fn update_image(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<UpdateImageRequest>,
) -> ApiResult<HttpResponse> {
    let current_user = authenticated_user(&req)?;
    if !data.users.update_user_image(&current_user, &body.image).await? {
        return Err(ApiError::NotFound("User"));
    }
    info!("User {} updated their profile image", current_user);

    let user = data
        .users
        .find_user_by_id(&current_user)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(HttpResponse::Ok().json(user))
}
