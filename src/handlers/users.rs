//! User registration, login and lookup.
use lambda_http::{Body, Request, Response};
use serde_json::{json, Value};

use crate::auth::{authorize_user, create_session, hash_password, AUTH_TOKEN_HEADER};
use crate::db_utils::AppState;
use crate::error::{is_unique_violation, ApiError};
use crate::http::{handle_options, header, parse_body_as, parse_id, query_param, respond, CorsPolicy};
use crate::models::{RegisterRequest, User};

pub const CORS: CorsPolicy = CorsPolicy {
    methods: "GET, POST, OPTIONS",
    headers: "Content-Type, X-Auth-Token",
};

/// Routes one invocation of the auth function.
///
/// - `POST {"action": "register", ...}` registers, `"login"` or no action logs in
/// - `GET ?user_id=` with `X-Auth-Token` returns the user
pub async fn handle_event(event: &Request, state: &AppState) -> Response<Body> {
    match event.method().as_str() {
        "OPTIONS" => handle_options(&CORS),
        "POST" => {
            let body = match parse_body_as::<AuthRequest>(event.body()) {
                Ok(body) => body,
                Err(e) => return e.into_response(),
            };
            match body.action.as_deref() {
                Some("register") => respond(201, handle_register(body.credentials, state).await),
                Some("login") | None => respond(200, handle_login(body.credentials, state).await),
                Some(other) => ApiError::UnsupportedAction(other.to_string()).into_response(),
            }
        }
        "GET" => respond(200, handle_get_user(event, state).await),
        other => ApiError::MethodNotAllowed(other.to_string()).into_response(),
    }
}

#[derive(Debug, serde::Deserialize)]
struct AuthRequest {
    action: Option<String>,
    #[serde(flatten)]
    credentials: RegisterRequest,
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{} is required", name)))
}

/// Creates the account and a first session.
///
/// # Database Interactions
/// - **`users`**: existence check on `email`, then `INSERT ... RETURNING`.
/// - **`user_sessions`**: one row for the issued token (see [`create_session`]).
///
/// # Logic
/// - A duplicate email, including one inserted concurrently between the check
///   and the insert, is reported as a conflict.
pub async fn handle_register(req: RegisterRequest, state: &AppState) -> Result<Value, ApiError> {
    let pool = &state.pool;
    let email = required(req.email, "email")?;
    let password = required(req.password, "password")?;
    let full_name = req.full_name.unwrap_or_default();
    let phone = req.phone.unwrap_or_default();

    let existing: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }

    let user: User = sqlx::query_as(
        "INSERT INTO users (email, password_hash, full_name, phone) VALUES ($1, $2, $3, $4) \
         RETURNING id, email, full_name, phone",
    )
    .bind(&email)
    .bind(hash_password(&password))
    .bind(&full_name)
    .bind(&phone)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("Email already registered")
        } else {
            ApiError::Database(e)
        }
    })?;

    let token = create_session(state, user.id).await?;
    tracing::info!(user_id = user.id, "user registered");

    Ok(json!({ "user": user, "token": token }))
}

pub async fn handle_login(req: RegisterRequest, state: &AppState) -> Result<Value, ApiError> {
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let user: User = sqlx::query_as(
        "SELECT id, email, full_name, phone FROM users WHERE email = $1 AND password_hash = $2",
    )
    .bind(&email)
    .bind(hash_password(&password))
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let token = create_session(state, user.id).await?;

    Ok(json!({ "user": user, "token": token }))
}

/// Public profile of `?user_id=`. The token header must be present; it is only
/// matched against stored sessions in strict mode.
pub async fn handle_get_user(event: &Request, state: &AppState) -> Result<Value, ApiError> {
    if header(event, AUTH_TOKEN_HEADER).is_none() {
        return Err(ApiError::unauthorized("No token provided"));
    }

    let user_id = match query_param(event, "user_id") {
        Some(raw) => parse_id(&raw, "user_id")?,
        None => return Err(ApiError::not_found("User not found")),
    };

    authorize_user(event, state, user_id).await?;

    let user: User = sqlx::query_as("SELECT id, email, full_name, phone FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(json!({ "user": user }))
}
