//! Shopping cart handlers (list, add, update, remove).
use lambda_http::{Body, Request, Response};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::auth::{authorize_user, USER_ID_HEADER};
use crate::db_utils::AppState;
use crate::error::ApiError;
use crate::http::{handle_options, header, parse_body_as, parse_id, query_param, respond, CorsPolicy};
use crate::models::{AddToCartRequest, CartItemQuantity, CartLine, UpdateCartRequest};

pub const CORS: CorsPolicy = CorsPolicy {
    methods: "GET, POST, PUT, DELETE, OPTIONS",
    headers: "Content-Type, X-Auth-Token, X-User-Id",
};

pub async fn handle_event(event: &Request, state: &AppState) -> Response<Body> {
    let method = event.method().as_str();
    if method == "OPTIONS" {
        return handle_options(&CORS);
    }

    let user_id = match caller_id(event, state).await {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match method {
        "GET" => respond(200, handle_list_cart(user_id, &state.pool).await),
        "POST" => {
            let result = match parse_body_as::<AddToCartRequest>(event.body()) {
                Ok(req) => handle_add_to_cart(user_id, req, &state.pool).await,
                Err(e) => Err(e),
            };
            respond(201, result)
        }
        "PUT" => {
            let result = match parse_body_as::<UpdateCartRequest>(event.body()) {
                Ok(req) => handle_update_cart_item(user_id, req, &state.pool).await,
                Err(e) => Err(e),
            };
            respond(200, result)
        }
        "DELETE" => {
            let result = match query_param(event, "id").map(|raw| parse_id(&raw, "id")).transpose() {
                Ok(item_id) => handle_remove_from_cart(user_id, item_id, &state.pool).await,
                Err(e) => Err(e),
            };
            respond(200, result)
        }
        other => ApiError::MethodNotAllowed(other.to_string()).into_response(),
    }
}

/// The cart owner named by `X-User-Id`
async fn caller_id(event: &Request, state: &AppState) -> Result<i32, ApiError> {
    let raw = header(event, USER_ID_HEADER)
        .ok_or_else(|| ApiError::unauthorized("User not authenticated"))?;
    let user_id = parse_id(raw, USER_ID_HEADER)?;
    authorize_user(event, state, user_id).await?;
    Ok(user_id)
}

/// Σ price × quantity over the cart lines
pub fn cart_total(lines: &[CartLine]) -> Result<Decimal, ApiError> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |total, line| {
            line.price
                .checked_mul(Decimal::from(line.quantity))
                .and_then(|amount| total.checked_add(amount))
        })
        .ok_or_else(|| ApiError::Internal("cart total out of range".to_string()))
}

/// Lists the caller's cart with catalog details and the running total.
///
/// # Database Interactions
/// - **`cart_items` JOIN `plants`**: every row for the user.
pub async fn handle_list_cart(user_id: i32, pool: &PgPool) -> Result<Value, ApiError> {
    let items: Vec<CartLine> = sqlx::query_as(
        "SELECT ci.id, ci.quantity, p.id AS plant_id, p.name, p.price, p.image, p.category \
         FROM cart_items ci \
         JOIN plants p ON ci.plant_id = p.id \
         WHERE ci.user_id = $1 \
         ORDER BY ci.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let total = cart_total(&items)?;
    Ok(json!({ "items": items, "total": total }))
}

/// Adds `quantity` (default 1) of a plant, merging into an existing row.
///
/// # Logic
/// - A single `INSERT ... ON CONFLICT (user_id, plant_id) DO UPDATE` so two
///   concurrent adds for the same plant both land on one row.
pub async fn handle_add_to_cart(user_id: i32, req: AddToCartRequest, pool: &PgPool) -> Result<Value, ApiError> {
    let plant_id = req.plant_id.ok_or_else(|| ApiError::bad_request("plant_id is required"))?;
    let quantity = req.quantity.unwrap_or(1);
    if quantity <= 0 {
        return Err(ApiError::bad_request("quantity must be positive"));
    }

    let row: CartItemQuantity = sqlx::query_as(
        "INSERT INTO cart_items (user_id, plant_id, quantity) VALUES ($1, $2, $3) \
         ON CONFLICT (user_id, plant_id) \
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
         RETURNING id, quantity",
    )
    .bind(user_id)
    .bind(plant_id)
    .bind(quantity)
    .fetch_one(pool)
    .await?;

    serde_json::to_value(&row).map_err(|e| ApiError::Internal(format!("Failed to serialize cart item: {}", e)))
}

pub async fn handle_update_cart_item(user_id: i32, req: UpdateCartRequest, pool: &PgPool) -> Result<Value, ApiError> {
    let item_id = req.id.ok_or_else(|| ApiError::bad_request("id is required"))?;
    let quantity = req.quantity.ok_or_else(|| ApiError::bad_request("quantity is required"))?;
    if quantity <= 0 {
        return Err(ApiError::bad_request("quantity must be positive"));
    }

    let row: CartItemQuantity = sqlx::query_as(
        "UPDATE cart_items SET quantity = $1 WHERE id = $2 AND user_id = $3 RETURNING id, quantity",
    )
    .bind(quantity)
    .bind(item_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Item not found"))?;

    serde_json::to_value(&row).map_err(|e| ApiError::Internal(format!("Failed to serialize cart item: {}", e)))
}

/// Removes one row when `item_id` is given, otherwise empties the cart.
/// Succeeds even when nothing matched.
pub async fn handle_remove_from_cart(user_id: i32, item_id: Option<i32>, pool: &PgPool) -> Result<Value, ApiError> {
    match item_id {
        Some(id) => {
            sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(pool)
                .await?;
        }
        None => {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
                .bind(user_id)
                .execute(pool)
                .await?;
        }
    }

    Ok(json!({ "success": true }))
}
