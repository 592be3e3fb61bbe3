//! Site settings and the admin credential.
use std::collections::BTreeMap;

use lambda_http::{Body, Request, Response};
use serde_json::{json, Map, Value};
use sqlx::PgPool;

use crate::auth::{check_admin_password, require_admin, set_admin_password, ADMIN_PASSWORD_KEY};
use crate::db_utils::AppState;
use crate::error::ApiError;
use crate::http::{get_value_in_json, handle_options, parse_json_body, respond, success_response, CorsPolicy};
use crate::models::SiteSetting;

pub const CORS: CorsPolicy = CorsPolicy {
    methods: "GET, POST, PUT, OPTIONS",
    headers: "Content-Type, X-Admin-Password",
};

pub async fn handle_event(event: &Request, state: &AppState) -> Response<Body> {
    match event.method().as_str() {
        "OPTIONS" => handle_options(&CORS),
        "GET" => respond(200, handle_list_settings(&state.pool).await),
        "POST" => {
            let body = match parse_json_body(event.body()) {
                Ok(body) => body,
                Err(e) => return e.into_response(),
            };
            match body.get("action").and_then(Value::as_str) {
                Some("change_password") => respond(200, handle_change_password(event, &body, state).await),
                Some("check") | None => match handle_check_password(&body, state).await {
                    Ok(true) => success_response(200, &json!({ "authenticated": true })),
                    Ok(false) => success_response(401, &json!({ "authenticated": false })),
                    Err(e) => e.into_response(),
                },
                Some(other) => ApiError::UnsupportedAction(other.to_string()).into_response(),
            }
        }
        "PUT" => {
            let result = match require_admin(event, state).await {
                Ok(()) => match parse_json_body(event.body()) {
                    Ok(body) => handle_update_settings(&body, &state.pool).await,
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };
            respond(200, result)
        }
        other => ApiError::MethodNotAllowed(other.to_string()).into_response(),
    }
}

/// Public settings as a flat map. The admin credential is never included.
pub async fn handle_list_settings(pool: &PgPool) -> Result<Value, ApiError> {
    let rows: Vec<SiteSetting> = sqlx::query_as("SELECT key, value FROM site_settings WHERE key <> $1")
        .bind(ADMIN_PASSWORD_KEY)
        .fetch_all(pool)
        .await?;

    let settings: BTreeMap<String, String> = rows.into_iter().map(|s| (s.key, s.value)).collect();
    Ok(json!(settings))
}

/// Compares `password` with the admin credential. A mismatch is a `false`,
/// not an error.
pub async fn handle_check_password(body: &Value, state: &AppState) -> Result<bool, ApiError> {
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
    check_admin_password(state, password).await
}

/// Key/value pairs to store from an update body. Skips the admin credential;
/// non-string values are kept as their JSON text.
pub fn settings_to_upsert(body: &Map<String, Value>) -> Vec<(String, String)> {
    body.iter()
        .filter(|(key, _)| key.as_str() != ADMIN_PASSWORD_KEY)
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Upserts every submitted setting in one transaction.
///
/// # Database Interactions
/// - **`site_settings`**: `INSERT ... ON CONFLICT (key) DO UPDATE` per key.
pub async fn handle_update_settings(body: &Value, pool: &PgPool) -> Result<Value, ApiError> {
    let fields = body
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Request body must be a JSON object"))?;
    let pairs = settings_to_upsert(fields);

    let mut tx = pool.begin().await?;
    for (key, value) in &pairs {
        sqlx::query(
            "INSERT INTO site_settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::info!(keys = pairs.len(), "site settings updated");
    Ok(json!({ "success": true }))
}

/// Replaces the admin credential. The current one must be supplied in
/// `X-Admin-Password`.
pub async fn handle_change_password(event: &Request, body: &Value, state: &AppState) -> Result<Value, ApiError> {
    require_admin(event, state).await?;

    let new_password: String = get_value_in_json(body, "new_password")?;
    if new_password.trim().is_empty() {
        return Err(ApiError::bad_request("new_password must not be empty"));
    }

    set_admin_password(&state.pool, &new_password).await?;
    tracing::info!("admin password changed");

    Ok(json!({ "success": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{lazy_state, request};

    #[test]
    fn test_settings_to_upsert_skips_admin_password() {
        let body = json!({
            "phone": "+7 900 000-00-00",
            "admin_password": "stolen",
            "free_delivery_from": 3000,
            "banner": null
        });
        let mut pairs = settings_to_upsert(body.as_object().unwrap());
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("banner".to_string(), "".to_string()),
                ("free_delivery_from".to_string(), "3000".to_string()),
                ("phone".to_string(), "+7 900 000-00-00".to_string()),
            ]
        );
    }

    #[test]
    fn test_settings_to_upsert_empty() {
        assert!(settings_to_upsert(&Map::new()).is_empty());
    }

    #[tokio::test]
    async fn test_options_preflight() {
        let state = lazy_state();
        let response = handle_event(&request("OPTIONS", &[], None), &state).await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers().get("Access-Control-Allow-Methods").unwrap(),
            "GET, POST, PUT, OPTIONS"
        );
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let state = lazy_state();
        let response = handle_event(&request("POST", &[], Some("{oops")), &state).await;
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_unknown_action_is_rejected() {
        let state = lazy_state();
        let event = request("POST", &[], Some(r#"{"action": "reset", "password": "x"}"#));
        assert_eq!(handle_event(&event, &state).await.status(), 405);
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let state = lazy_state();
        assert_eq!(handle_event(&request("DELETE", &[], None), &state).await.status(), 405);
    }
}
