// src/main.rs

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info};

use chatverse::app_state::AppState;
use chatverse::auth::Authentication;
use chatverse::chat_db::MongoDB;
use chatverse::config::{Config, StoreKind};
use chatverse::ledger::Ledger;
use chatverse::memory_store::MemoryStore;
use chatverse::routes;
use chatverse::store::{RoomStore, UserStore};

fn invalid_input(err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|err| {
        error!("Invalid configuration: {}", err);
        invalid_input(err)
    })?;

    let (rooms, users): (Arc<dyn RoomStore>, Arc<dyn UserStore>) = match config.store {
        StoreKind::Mongo => {
            let uri = config.mongo_uri.as_deref().unwrap_or_default();
            let mongodb = Arc::new(
                MongoDB::init(uri, &config.database_name)
                    .await
                    .map_err(invalid_input)?,
            );
            let rooms: Arc<dyn RoomStore> = mongodb.clone();
            let users: Arc<dyn UserStore> = mongodb;
            (rooms, users)
        }
        StoreKind::Memory => {
            info!("Using in-memory store; data is lost on shutdown");
            let memory = Arc::new(MemoryStore::new());
            let rooms: Arc<dyn RoomStore> = memory.clone();
            let users: Arc<dyn UserStore> = memory;
            (rooms, users)
        }
    };

    let state = AppState {
        ledger: Arc::new(Ledger::new(rooms)),
        users,
        config: config.clone(),
    };

    info!("Server running at http://{}", config.bind_addr);
    info!("Allowed CORS Origin: {}", config.frontend_origin);

    let frontend_origin = config.frontend_origin.clone();
    let jwt_secret = config.jwt_secret.clone();

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication::new(jwt_secret.clone()))
            .app_data(web::Data::new(state.clone()))
            .configure(routes)
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
