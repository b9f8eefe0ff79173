#![allow(dead_code)]

use std::sync::Arc;

use actix_web::http::header;
use chatverse::{
    app_state::AppState,
    auth::{create_jwt, register, SignupInfo},
    config::{Config, StoreKind},
    ledger::Ledger,
    memory_store::MemoryStore,
};

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestUser {
    pub id: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", self.token))
    }
}

pub fn test_config() -> Config {
    Config {
        store: StoreKind::Memory,
        mongo_uri: None,
        database_name: "chatverse-test".into(),
        jwt_secret: JWT_SECRET.into(),
        frontend_origin: "http://localhost:3000".into(),
        bind_addr: "127.0.0.1:0".into(),
        bcrypt_cost: 4,
    }
}

pub fn app_state() -> AppState {
    let store = Arc::new(MemoryStore::new());
    AppState {
        ledger: Arc::new(Ledger::new(store.clone())),
        users: store,
        config: test_config(),
    }
}

/// Registers straight through the user store and mints a token for the user.
pub async fn register_user(state: &AppState, name: &str) -> TestUser {
    let info = SignupInfo {
        name: name.to_string(),
        email: format!("{}@chatverse.test", name.to_lowercase()),
        password: "password123".into(),
    };
    let user = register(state.users.as_ref(), info, state.config.bcrypt_cost)
        .await
        .expect("registration should succeed");
    let token = create_jwt(&user.id, JWT_SECRET).expect("token should encode");

    TestUser { id: user.id, token }
}
