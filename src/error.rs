use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::{auth::AuthError, ledger::LedgerError, store::StoreError};

const RETRY_MESSAGE: &str = "Something went wrong on our side. Please try again.";

/// Every failure a handler can return, rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Ledger(err) => match err {
                LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
                LedgerError::Permission(_) | LedgerError::EditWindowExpired => {
                    StatusCode::FORBIDDEN
                }
                LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Auth(err) => match err {
                AuthError::Unauthorized | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                AuthError::EmailTaken => StatusCode::CONFLICT,
                AuthError::PasswordHashingFailed(_)
                | AuthError::EncodingTokenError
                | AuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            RETRY_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(json!({ "error": message }))
    }
}
