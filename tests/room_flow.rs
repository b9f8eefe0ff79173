use actix_web::{http::StatusCode, test, web, App};
use chatverse::{
    auth::{create_jwt, Authentication},
    models::{Message, RoomView, Visibility},
    routes,
};
use serde_json::{json, Value};

mod common;

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .wrap(Authentication::new(common::JWT_SECRET))
                .app_data(web::Data::new($state.clone()))
                .configure(routes),
        )
        .await
    };
}

#[actix_web::test]
async fn synthwave_room_lifecycle() {
    let state = common::app_state();
    let app = test_app!(state);
    let a = common::register_user(&state, "Alice").await;
    let b = common::register_user(&state, "Bob").await;
    let c = common::register_user(&state, "Carol").await;

    let req = test::TestRequest::post()
        .uri("/rooms")
        .insert_header(a.bearer())
        .set_json(json!({
            "name": "Synthwave",
            "description": "Neon-soaked retro beats",
            "visibility": "public",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let room: RoomView = test::read_body_json(resp).await;
    assert_eq!(room.member_count, 1);
    assert!(room.is_creator);
    assert_eq!(room.avatar_fallback, "S");

    let req = test::TestRequest::post()
        .uri(&format!("/rooms/{}/join", room.id))
        .insert_header(b.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let joined: RoomView = test::read_body_json(resp).await;
    assert_eq!(joined.member_count, 2);
    assert!(joined.is_joined);

    let req = test::TestRequest::post()
        .uri(&format!("/rooms/{}/messages", room.id))
        .insert_header(b.bearer())
        .set_json(json!({ "text": "hello" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let hello: Message = test::read_body_json(resp).await;
    assert_eq!(hello.author_id, b.id);
    assert_eq!(hello.author_name, "Bob");

    let req = test::TestRequest::get()
        .uri(&format!("/rooms/{}/messages", room.id))
        .to_request();
    let messages: Vec<Message> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].author_id, b.id);

    let req = test::TestRequest::put()
        .uri(&format!("/rooms/{}/messages/{}", room.id, hello.id))
        .insert_header(b.bearer())
        .set_json(json!({ "text": "hello!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/rooms/{}/messages", room.id))
        .to_request();
    let messages: Vec<Message> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(messages[0].text, "hello!");
    assert!(messages[0].edited_at.is_some());

    let req = test::TestRequest::post()
        .uri(&format!("/rooms/{}/messages", room.id))
        .insert_header(c.bearer())
        .set_json(json!({ "text": "let me in" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/rooms/{}", room.id))
        .insert_header(b.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/rooms/{}", room.id))
        .insert_header(a.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/rooms/{}", room.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&format!("/rooms/{}/messages", room.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn private_room_is_gated_by_passkey() {
    let state = common::app_state();
    let app = test_app!(state);
    let owner = common::register_user(&state, "Owner").await;
    let guest = common::register_user(&state, "Guest").await;
    let outsider = common::register_user(&state, "Outsider").await;

    let req = test::TestRequest::post()
        .uri("/rooms")
        .insert_header(owner.bearer())
        .set_json(json!({
            "name": "Inner Circle",
            "description": "members only",
            "visibility": "private",
            "passkey": "open sesame",
        }))
        .to_request();
    let room: RoomView = test::call_and_read_body_json(&app, req).await;
    assert_eq!(room.visibility, Visibility::Private);
    assert_eq!(room.passkey.as_deref(), Some("open sesame"));
    assert_eq!(room.avatar_fallback, "IC");

    for body in [json!({}), json!({ "passkey": "open says me" })] {
        let req = test::TestRequest::post()
            .uri(&format!("/rooms/{}/join", room.id))
            .insert_header(guest.bearer())
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    let req = test::TestRequest::post()
        .uri(&format!("/rooms/{}/join", room.id))
        .insert_header(guest.bearer())
        .set_json(json!({ "passkey": "open sesame" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let joined: RoomView = test::read_body_json(resp).await;
    assert!(joined.is_joined);
    assert!(joined.has_passkey);
    assert!(joined.passkey.is_none());
    assert_eq!(joined.member_count, 2);

    // already a member: no passkey needed, no double count
    let req = test::TestRequest::post()
        .uri(&format!("/rooms/{}/join", room.id))
        .insert_header(guest.bearer())
        .to_request();
    let again: RoomView = test::call_and_read_body_json(&app, req).await;
    assert_eq!(again.member_count, 2);

    let req = test::TestRequest::get()
        .uri(&format!("/rooms/{}/messages", room.id))
        .insert_header(outsider.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri(&format!("/rooms/{}/messages", room.id))
        .insert_header(guest.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn short_passkey_is_a_validation_error() {
    let state = common::app_state();
    let app = test_app!(state);
    let owner = common::register_user(&state, "Owner").await;

    let req = test::TestRequest::post()
        .uri("/rooms")
        .insert_header(owner.bearer())
        .set_json(json!({
            "name": "Tiny",
            "description": "short key",
            "visibility": "private",
            "passkey": "1234567",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Passkey must be at least 8 characters");
}

#[actix_web::test]
async fn making_room_public_clears_passkey() {
    let state = common::app_state();
    let app = test_app!(state);
    let owner = common::register_user(&state, "Owner").await;
    let member = common::register_user(&state, "Member").await;

    let req = test::TestRequest::post()
        .uri("/rooms")
        .insert_header(owner.bearer())
        .set_json(json!({
            "name": "Vault",
            "description": "locked",
            "visibility": "private",
            "passkey": "correct horse",
        }))
        .to_request();
    let room: RoomView = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::put()
        .uri(&format!("/rooms/{}", room.id))
        .insert_header(member.bearer())
        .set_json(json!({ "visibility": "public" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&format!("/rooms/{}", room.id))
        .insert_header(owner.bearer())
        .set_json(json!({ "visibility": "public", "passkey": "still here?" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: RoomView = test::read_body_json(resp).await;
    assert_eq!(updated.visibility, Visibility::Public);
    assert!(updated.passkey.is_none());
    assert!(!updated.has_passkey);
}

#[actix_web::test]
async fn creator_cannot_leave_but_members_can() {
    let state = common::app_state();
    let app = test_app!(state);
    let owner = common::register_user(&state, "Owner").await;
    let member = common::register_user(&state, "Member").await;

    let req = test::TestRequest::post()
        .uri("/rooms")
        .insert_header(owner.bearer())
        .set_json(json!({ "name": "Lounge", "description": "chill", "visibility": "public" }))
        .to_request();
    let room: RoomView = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/rooms/{}/leave", room.id))
        .insert_header(owner.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/rooms/{}/join", room.id))
        .insert_header(member.bearer())
        .to_request();
    test::call_service(&app, req).await;

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&format!("/rooms/{}/leave", room.id))
            .insert_header(member.bearer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let left: RoomView = test::read_body_json(resp).await;
        assert_eq!(left.member_count, 1);
        assert!(!left.is_joined);
    }
}

#[actix_web::test]
async fn room_listings_by_member_and_creator() {
    let state = common::app_state();
    let app = test_app!(state);
    let alice = common::register_user(&state, "Alice").await;
    let bob = common::register_user(&state, "Bob").await;

    let mut ids = Vec::new();
    for (user, name) in [(&alice, "Alpha"), (&bob, "Beta"), (&bob, "Gamma")] {
        let req = test::TestRequest::post()
            .uri("/rooms")
            .insert_header(user.bearer())
            .set_json(json!({ "name": name, "description": "room", "visibility": "public" }))
            .to_request();
        let room: RoomView = test::call_and_read_body_json(&app, req).await;
        ids.push(room.id);
    }

    let req = test::TestRequest::post()
        .uri(&format!("/rooms/{}/join", ids[1]))
        .insert_header(alice.bearer())
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/rooms").to_request();
    let all: Vec<RoomView> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, ids[1]);

    let req = test::TestRequest::get()
        .uri(&format!("/rooms/member/{}", alice.id))
        .insert_header(alice.bearer())
        .to_request();
    let joined: Vec<RoomView> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(joined.len(), 2);
    assert!(joined.iter().all(|room| room.is_joined));

    let req = test::TestRequest::get()
        .uri(&format!("/rooms/creator/{}", bob.id))
        .insert_header(bob.bearer())
        .to_request();
    let created: Vec<RoomView> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|room| room.is_creator));

    let req = test::TestRequest::get()
        .uri(&format!("/rooms/creator/{}", bob.id))
        .insert_header(alice.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn mutations_require_a_valid_token() {
    let state = common::app_state();
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/rooms")
        .set_json(json!({ "name": "Anon", "description": "nope", "visibility": "public" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/rooms")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .set_json(json!({ "name": "Anon", "description": "nope", "visibility": "public" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn token_without_user_record_cannot_create_or_join() {
    let state = common::app_state();
    let app = test_app!(state);
    let owner = common::register_user(&state, "Owner").await;
    let stranger = common::TestUser {
        id: "unregistered-user".into(),
        token: create_jwt("unregistered-user", common::JWT_SECRET).unwrap(),
    };

    let req = test::TestRequest::post()
        .uri("/rooms")
        .insert_header(stranger.bearer())
        .set_json(json!({ "name": "Nowhere", "description": "no owner", "visibility": "public" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "User not found");

    let req = test::TestRequest::get().uri("/rooms").to_request();
    let all: Vec<RoomView> = test::call_and_read_body_json(&app, req).await;
    assert!(all.is_empty());

    let req = test::TestRequest::post()
        .uri("/rooms")
        .insert_header(owner.bearer())
        .set_json(json!({ "name": "Lobby", "description": "open", "visibility": "public" }))
        .to_request();
    let room: RoomView = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/rooms/{}/join", room.id))
        .insert_header(stranger.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&format!("/rooms/{}", room.id))
        .to_request();
    let after: RoomView = test::call_and_read_body_json(&app, req).await;
    assert_eq!(after.member_count, 1);
    assert_eq!(after.member_ids, vec![owner.id]);
}
