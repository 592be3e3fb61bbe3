//! Credentials, sessions and the admin password

use base64::{Engine as _, engine::general_purpose};
use lambda_http::Request;
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::db_utils::AppState;
use crate::error::ApiError;
use crate::http::header;

pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
pub const USER_ID_HEADER: &str = "X-User-Id";
pub const ADMIN_PASSWORD_HEADER: &str = "X-Admin-Password";

/// `site_settings` key holding the admin credential. Only this module reads or
/// writes it; the settings list and update paths skip it.
pub const ADMIN_PASSWORD_KEY: &str = "admin_password";

/// One-way digest stored in `users.password_hash` (lowercase hex SHA-256).
/// A fast hash: kept for compatibility with existing rows.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Opaque bearer token: 32 random bytes, URL-safe base64 without padding (43 chars)
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes[..]);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Persists a new session for `user_id` and returns its token.
///
/// # Database Interactions
/// - **`user_sessions`**: deletes the user's expired sessions, then inserts the new one.
pub async fn create_session(state: &AppState, user_id: i32) -> Result<String, ApiError> {
    let purged = sqlx::query(
        "DELETE FROM user_sessions \
         WHERE user_id = $1 AND created_at <= CURRENT_TIMESTAMP - make_interval(days => $2)",
    )
    .bind(user_id)
    .bind(state.config.session_ttl_days)
    .execute(&state.pool)
    .await?
    .rows_affected();
    if purged > 0 {
        tracing::debug!(user_id, purged, "expired sessions removed");
    }

    let token = generate_token();
    sqlx::query("INSERT INTO user_sessions (token, user_id) VALUES ($1, $2)")
        .bind(&token)
        .bind(user_id)
        .execute(&state.pool)
        .await?;
    Ok(token)
}

/// User owning `token`, if the session exists and has not expired
pub async fn session_user(state: &AppState, token: &str) -> Result<Option<i32>, ApiError> {
    let user_id: Option<i32> = sqlx::query_scalar(
        "SELECT user_id FROM user_sessions \
         WHERE token = $1 AND created_at > CURRENT_TIMESTAMP - make_interval(days => $2)",
    )
    .bind(token)
    .bind(state.config.session_ttl_days)
    .fetch_optional(&state.pool)
    .await?;
    Ok(user_id)
}

/// Checks the caller may act as `user_id`.
///
/// Outside strict mode the asserted identity is trusted as-is. In strict mode
/// the `X-Auth-Token` header must name a stored session owned by `user_id`.
pub async fn authorize_user(event: &Request, state: &AppState, user_id: i32) -> Result<(), ApiError> {
    if !state.config.strict_auth {
        return Ok(());
    }

    let token = header(event, AUTH_TOKEN_HEADER)
        .ok_or_else(|| ApiError::unauthorized("No token provided"))?;

    match session_user(state, token).await? {
        Some(owner) if owner == user_id => Ok(()),
        _ => {
            tracing::warn!(user_id, "session token does not match asserted user");
            Err(ApiError::unauthorized("Invalid session"))
        }
    }
}

/// The admin credential, falling back to the configured default when unset
pub async fn stored_admin_password(state: &AppState) -> Result<String, ApiError> {
    let stored: Option<String> = sqlx::query_scalar("SELECT value FROM site_settings WHERE key = $1")
        .bind(ADMIN_PASSWORD_KEY)
        .fetch_optional(&state.pool)
        .await?;
    Ok(stored.unwrap_or_else(|| state.config.default_admin_password.clone()))
}

pub async fn check_admin_password(state: &AppState, candidate: &str) -> Result<bool, ApiError> {
    let stored = stored_admin_password(state).await?;
    Ok(candidate == stored)
}

/// Gate for admin-only writes: the `X-Admin-Password` header must equal the
/// stored admin credential.
pub async fn require_admin(event: &Request, state: &AppState) -> Result<(), ApiError> {
    let supplied = header(event, ADMIN_PASSWORD_HEADER).unwrap_or_default();
    if check_admin_password(state, supplied).await? {
        Ok(())
    } else {
        tracing::warn!("rejected admin credential");
        Err(ApiError::unauthorized("Unauthorized"))
    }
}

/// Orders only require the header to be present unless strict mode is on.
pub async fn require_admin_header(event: &Request, state: &AppState) -> Result<(), ApiError> {
    if header(event, ADMIN_PASSWORD_HEADER).is_none() {
        return Err(ApiError::unauthorized("Unauthorized"));
    }
    if state.config.strict_auth {
        require_admin(event, state).await?;
    }
    Ok(())
}

pub async fn set_admin_password(pool: &PgPool, new_password: &str) -> Result<(), ApiError> {
    sqlx::query(
        "INSERT INTO site_settings (key, value) VALUES ($1, $2) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(ADMIN_PASSWORD_KEY)
    .bind(new_password)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_is_sha256_hex() {
        assert_eq!(
            hash_password("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
        assert_ne!(hash_password("password"), hash_password("Password"));
    }

    #[test]
    fn test_generate_token() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(token, generate_token());
    }
}
