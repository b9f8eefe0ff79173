pub mod app_state;
pub mod auth;
pub mod chat;
pub mod chat_db;
pub mod config;
pub mod error;
pub mod ledger;
pub mod memory_store;
pub mod models;
pub mod optimistic;
pub mod rooms;
pub mod store;
pub mod user_management;

use actix_web::web;

use crate::auth::{login_endpoint, signup};
use crate::chat::{create_message, edit_message, get_messages};
use crate::rooms::{
    create_room, delete_room, get_room, join_room, leave_room, list_created_rooms,
    list_member_rooms, list_rooms, update_room,
};
use crate::user_management::{get_current_user, get_user_by_id, update_image};

/// Mounts every endpoint. Shared by the server and the HTTP tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/signup", web::post().to(signup))
            .route("/login", web::post().to(login_endpoint)),
    )
    // USERS
    .service(
        web::scope("/users")
            .route("/me", web::get().to(get_current_user))
            .route("/me/image", web::put().to(update_image))
            .route("/{id}", web::get().to(get_user_by_id)),
    )
    // ROOMS
    .service(
        web::scope("/rooms")
            .route("", web::get().to(list_rooms))
            .route("", web::post().to(create_room))
            .route("/member/{user_id}", web::get().to(list_member_rooms))
            .route("/creator/{user_id}", web::get().to(list_created_rooms))
            .service(
                web::scope("/{room_id}")
                    .route("", web::get().to(get_room))
                    .route("", web::put().to(update_room))
                    .route("", web::delete().to(delete_room))
                    .route("/join", web::post().to(join_room))
                    .route("/leave", web::post().to(leave_room))
                    // MESSAGES
                    .route("/messages", web::get().to(get_messages))
                    .route("/messages", web::post().to(create_message))
                    .route("/messages/{message_id}", web::put().to(edit_message)),
            ),
    );
}
