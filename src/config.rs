use std::env;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Mongo,
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub store: StoreKind,
    pub mongo_uri: Option<String>,
    pub database_name: String,
    pub jwt_secret: String,
    pub frontend_origin: String,
    pub bind_addr: String,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let store = match env::var("CHATVERSE_STORE")
            .unwrap_or_else(|_| "mongo".to_string())
            .as_str()
        {
            "mongo" => StoreKind::Mongo,
            "memory" => StoreKind::Memory,
            other => return Err(ConfigError::Invalid("CHATVERSE_STORE", other.to_string())),
        };

        let mongo_uri = env::var("MONGO_URI").ok();
        if store == StoreKind::Mongo && mongo_uri.is_none() {
            return Err(ConfigError::Missing("MONGO_URI"));
        }

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("BCRYPT_COST", raw))?,
            Err(_) => bcrypt::DEFAULT_COST,
        };

        Ok(Self {
            store,
            mongo_uri,
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "chatverse".to_string()),
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            frontend_origin: env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            bcrypt_cost,
        })
    }
}
