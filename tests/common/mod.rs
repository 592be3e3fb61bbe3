//! Shared helpers for the database-backed scenario tests.
//!
//! These tests need a PostgreSQL reachable through `DATABASE_URL` and are
//! `#[ignore]`d by default: `DATABASE_URL=... cargo test -- --ignored`.
#![allow(dead_code)]

use std::collections::HashMap;

use lambda_http::{Body, Request, RequestExt, Response};
use plant_shop::auth::generate_token;
use plant_shop::db_utils::{run_migrations, AppState};
use serde_json::{json, Value};

pub async fn state() -> AppState {
    let state = AppState::from_env().await.expect("DATABASE_URL must point at a test database");
    run_migrations(&state.pool).await.expect("migrations");
    state
}

pub fn request(method: &str, headers: &[(&str, &str)], query: &[(&str, &str)], body: Option<Value>) -> Request {
    let mut builder = lambda_http::http::Request::builder().method(method).uri("/");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let body = match body {
        Some(json) => Body::Text(json.to_string()),
        None => Body::Empty,
    };
    let params: HashMap<String, String> = query
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    builder
        .body(body)
        .expect("request")
        .with_query_string_parameters(params)
}

pub fn body(response: &Response<Body>) -> Value {
    match response.body() {
        Body::Text(text) => serde_json::from_str(text).expect("json body"),
        Body::Empty => Value::Null,
        other => panic!("unexpected body: {:?}", other),
    }
}

pub fn unique_email() -> String {
    format!("{}@example.test", generate_token().to_lowercase())
}

/// Registers a fresh user and returns (user id, token)
pub async fn register(state: &AppState) -> (i64, String) {
    let event = request(
        "POST",
        &[],
        &[],
        Some(json!({
            "action": "register",
            "email": unique_email(),
            "password": "secret",
            "full_name": "Test Gardener",
            "phone": "+1 555 0100"
        })),
    );
    let response = plant_shop::handlers::users::handle_event(&event, state).await;
    assert_eq!(response.status(), 201);
    let json = body(&response);
    let id = json["user"]["id"].as_i64().expect("user id");
    let token = json["token"].as_str().expect("token").to_string();
    (id, token)
}

/// Inserts a catalog plant directly and returns its id
pub async fn insert_plant(state: &AppState, name: &str, price: i64) -> i64 {
    let id: i32 = sqlx::query_scalar("INSERT INTO plants (name, price, category) VALUES ($1, $2, 'decorative') RETURNING id")
        .bind(name)
        .bind(rust_decimal::Decimal::from(price))
        .fetch_one(&state.pool)
        .await
        .expect("insert plant");
    i64::from(id)
}
