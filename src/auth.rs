use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http, web, Error, HttpMessage, HttpRequest, HttpResponse,
};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use futures::future::{ok, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    error::ApiResult,
    models::User,
    store::{StoreError, UserStore},
};

pub type AuthResult<T> = Result<T, AuthError>;

const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Deserialize)]
pub struct SignupInfo {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginInfo {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Validation(String),
    #[error("An account with this email already exists.")]
    EmailTaken,
    #[error("Failed password hashing: {0}")]
    PasswordHashingFailed(String),
    #[error("encode token error")]
    EncodingTokenError,
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

// JWT Creation
pub fn create_jwt(user_id: &str, secret: &str) -> AuthResult<String> {
    let expiration = Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
        .map_err(|_| AuthError::EncodingTokenError)
}

// JWT Validation
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// The user id the middleware attached to this request, if any.
pub fn authenticated_user(req: &HttpRequest) -> AuthResult<String> {
    req.extensions()
        .get::<String>()
        .cloned()
        .ok_or(AuthError::Unauthorized)
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

pub async fn register(
    users: &dyn UserStore,
    info: SignupInfo,
    bcrypt_cost: u32,
) -> AuthResult<User> {
    let name = info.name.trim().to_string();
    let email = info.email.trim().to_lowercase();

    if name.chars().count() < 2 {
        return Err(AuthError::Validation("Name must be at least 2 characters.".into()));
    }
    if !email_pattern().is_match(&email) {
        return Err(AuthError::Validation("Please enter a valid email.".into()));
    }
    if info.password.chars().count() < 6 {
        return Err(AuthError::Validation("Password must be at least 6 characters.".into()));
    }
    if users.find_user_by_email(&email).await?.is_some() {
        return Err(AuthError::EmailTaken);
    }

    let password_hash = hash(&info.password, bcrypt_cost)
        .map_err(|err| AuthError::PasswordHashingFailed(err.to_string()))?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        image: None,
        password_hash: Some(password_hash),
        created_at: Utc::now(),
    };

    match users.insert_user(&user).await {
        Ok(()) => Ok(user),
        Err(StoreError::Duplicate(_)) => Err(AuthError::EmailTaken),
        Err(err) => Err(err.into()),
    }
}

/// Returns the user and a fresh token. Accounts without a password hash
/// (created through an external provider) cannot log in here.
pub async fn login(
    users: &dyn UserStore,
    email: &str,
    password: &str,
    jwt_secret: &str,
) -> AuthResult<(User, String)> {
    let user = users
        .find_user_by_email(&email.trim().to_lowercase())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let Some(password_hash) = user.password_hash.as_deref() else {
        return Err(AuthError::InvalidCredentials);
    };
    if !verify(password, password_hash).unwrap_or(false) {
        return Err(AuthError::InvalidCredentials);
    }

    let token = create_jwt(&user.id, jwt_secret)?;
    Ok((user, token))
}

// ─── MIDDLEWARE ───────────────────────────────────────────────────────────────

/// Decodes a `Bearer` token when present and stores the user id in the request
/// extensions. Requests without a token pass through; handlers decide.
#[derive(Debug, Clone)]
pub struct Authentication {
    secret: String,
}

impl Authentication {
    pub fn new(secret: impl Into<String>) -> Self {
        Authentication { secret: secret.into() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service,
            secret: self.secret.clone(),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    secret: String,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string());

        if let Some(token) = token {
            match validate_jwt(&token, &self.secret) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims.sub);
                }
                Err(e) => {
                    debug!("Rejected bearer token: {}", e);
                    let (req_parts, _payload) = req.into_parts();
                    let resp = HttpResponse::Unauthorized()
                        .json(json!({ "error": "Invalid or expired token" }))
                        .map_into_boxed_body();
                    let srv_resp = ServiceResponse::new(req_parts, resp);
                    return Box::pin(async move { Ok(srv_resp) });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

// ─── ENDPOINTS ────────────────────────────────────────────────────────────────

// POST /auth/signup
pub async fn signup(
    data: web::Data<AppState>,
    signup_info: web::Json<SignupInfo>,
) -> ApiResult<HttpResponse> {
    debug!("signup called for {}", signup_info.email);
    let user = register(
        data.users.as_ref(),
        signup_info.into_inner(),
        data.config.bcrypt_cost,
    )
    .await
    .inspect_err(|err| warn!("Signup rejected: {}", err))?;

    info!("User {} registered", user.id);
    Ok(HttpResponse::Created().json(user))
}

// POST /auth/login
pub async fn login_endpoint(
    data: web::Data<AppState>,
    login_info: web::Json<LoginInfo>,
) -> ApiResult<HttpResponse> {
    let (user, token) = login(
        data.users.as_ref(),
        &login_info.email,
        &login_info.password,
        &data.config.jwt_secret,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "token": token, "user_id": user.id })))
}
