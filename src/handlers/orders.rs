//! Order placement, lookup and fulfillment status.
use std::collections::HashMap;

use lambda_http::{Body, Request, Response};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::auth::{authorize_user, require_admin_header, ADMIN_PASSWORD_HEADER};
use crate::db_utils::AppState;
use crate::error::ApiError;
use crate::http::{handle_options, header, parse_body_as, parse_id, query_param, respond, CorsPolicy};
use crate::models::{CreateOrderRequest, NewOrderItem, Order, OrderLine, OrderStatus, UpdateOrderStatusRequest};

pub const CORS: CorsPolicy = CorsPolicy {
    methods: "GET, POST, PUT, OPTIONS",
    headers: "Content-Type, X-User-Id, X-Auth-Token, X-Admin-Password",
};

/// Statuses the storefront knows how to display. Anything else is stored but logged.
pub const KNOWN_STATUSES: [&str; 5] = ["pending", "processing", "shipped", "delivered", "cancelled"];

const ORDER_COLUMNS: &str = "o.id, o.user_id, o.total_amount, o.status, o.delivery_address, o.created_at";

/// Which orders a GET asks for
#[derive(Debug, PartialEq, Eq)]
pub enum OrderQuery {
    ById(i32),
    All,
    ForUser(i32),
}

impl OrderQuery {
    /// Resolves the selector with precedence `order_id` > admin header > `user_id`.
    pub fn from_params(
        order_id: Option<&str>,
        admin_header: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Self, ApiError> {
        if let Some(raw) = order_id {
            return Ok(OrderQuery::ById(parse_id(raw, "order_id")?));
        }
        if admin_header.is_some() {
            return Ok(OrderQuery::All);
        }
        if let Some(raw) = user_id {
            return Ok(OrderQuery::ForUser(parse_id(raw, "user_id")?));
        }
        Err(ApiError::bad_request("Missing required parameters"))
    }
}

pub async fn handle_event(event: &Request, state: &AppState) -> Response<Body> {
    match event.method().as_str() {
        "OPTIONS" => handle_options(&CORS),
        "GET" => respond(200, handle_get_orders(event, state).await),
        "POST" => {
            let result = match parse_body_as::<CreateOrderRequest>(event.body()) {
                Ok(req) => handle_create_order(event, req, state).await,
                Err(e) => Err(e),
            };
            respond(201, result)
        }
        "PUT" => respond(200, handle_update_status(event, state).await),
        other => ApiError::MethodNotAllowed(other.to_string()).into_response(),
    }
}

async fn handle_get_orders(event: &Request, state: &AppState) -> Result<Value, ApiError> {
    let order_id = query_param(event, "order_id");
    let user_id = query_param(event, "user_id");
    let query = OrderQuery::from_params(
        order_id.as_deref(),
        header(event, ADMIN_PASSWORD_HEADER),
        user_id.as_deref(),
    )?;

    match query {
        OrderQuery::ById(id) => handle_get_order(id, &state.pool).await,
        OrderQuery::All => {
            require_admin_header(event, state).await?;
            handle_list_all_orders(&state.pool).await
        }
        OrderQuery::ForUser(id) => {
            authorize_user(event, state, id).await?;
            handle_list_user_orders(id, &state.pool).await
        }
    }
}

/// Loads the line items for `orders` in one query and attaches them.
///
/// # Database Interactions
/// - **`order_items` LEFT JOIN `plants`**: `order_id = ANY($1)`; deleted plants
///   still yield their captured quantity and price.
async fn attach_lines(orders: &mut [Order], pool: &PgPool) -> Result<(), ApiError> {
    if orders.is_empty() {
        return Ok(());
    }

    let ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let lines: Vec<OrderLine> = sqlx::query_as(
        "SELECT oi.order_id, oi.plant_id, oi.quantity, oi.price, p.name, p.image \
         FROM order_items oi \
         LEFT JOIN plants p ON oi.plant_id = p.id \
         WHERE oi.order_id = ANY($1) \
         ORDER BY oi.id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_order: HashMap<i32, Vec<OrderLine>> = HashMap::new();
    for line in lines {
        by_order.entry(line.order_id).or_default().push(line);
    }
    for order in orders.iter_mut() {
        order.items = by_order.remove(&order.id).unwrap_or_default();
    }

    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(format!("Failed to serialize orders: {}", e)))
}

/// One order with purchaser fields and line items; 404 when absent.
pub async fn handle_get_order(order_id: i32, pool: &PgPool) -> Result<Value, ApiError> {
    let order: Order = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS}, u.full_name, u.email, u.phone \
         FROM orders o \
         JOIN users u ON o.user_id = u.id \
         WHERE o.id = $1"
    ))
    .bind(order_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Order not found"))?;

    let mut orders = [order];
    attach_lines(&mut orders, pool).await?;
    to_json(&orders[0])
}

/// Every order, newest first, for the admin panel.
pub async fn handle_list_all_orders(pool: &PgPool) -> Result<Value, ApiError> {
    let mut orders: Vec<Order> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS}, u.full_name, u.email, u.phone \
         FROM orders o \
         JOIN users u ON o.user_id = u.id \
         ORDER BY o.created_at DESC, o.id DESC"
    ))
    .fetch_all(pool)
    .await?;

    attach_lines(&mut orders, pool).await?;
    to_json(&orders)
}

pub async fn handle_list_user_orders(user_id: i32, pool: &PgPool) -> Result<Value, ApiError> {
    let mut orders: Vec<Order> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} \
         FROM orders o \
         WHERE o.user_id = $1 \
         ORDER BY o.created_at DESC, o.id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    attach_lines(&mut orders, pool).await?;
    to_json(&orders)
}

/// Largest amount a `NUMERIC(10, 2)` column holds
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Rounds a submitted price to cents the way PostgreSQL stores `NUMERIC(10, 2)`
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Σ price × quantity over cent-rounded prices, so the total equals the sum of
/// the stored line items. Overflow and totals above [`MAX_AMOUNT`] are rejected.
pub fn order_total(items: &[NewOrderItem]) -> Result<Decimal, ApiError> {
    let out_of_range = || ApiError::bad_request("order total out of range");
    let total = items.iter().try_fold(Decimal::ZERO, |total, item| {
        round_price(item.price)
            .checked_mul(Decimal::from(item.quantity))
            .and_then(|line| total.checked_add(line))
            .ok_or_else(out_of_range)
    })?;
    if total > MAX_AMOUNT {
        return Err(out_of_range());
    }
    Ok(total)
}

/// Places an order from the submitted line items.
///
/// # Database Interactions
/// All inside one transaction; dropping it uncommitted rolls every write back.
/// - **`orders`**: `INSERT` with status `pending`.
/// - **`order_items`**: one `INSERT` per line with the captured price.
/// - **`cart_items`**: `DELETE` every row of the user.
///
/// # Logic
/// - Prices come from the request and are not re-read from the catalog. Each is
///   rounded to cents before it is summed or stored.
pub async fn handle_create_order(event: &Request, req: CreateOrderRequest, state: &AppState) -> Result<Value, ApiError> {
    let user_id = match req.user_id {
        Some(id) if !req.items.is_empty() => id,
        _ => return Err(ApiError::bad_request("Missing user_id or items")),
    };
    if req.items.iter().any(|item| item.quantity <= 0) {
        return Err(ApiError::bad_request("Item quantities must be positive"));
    }
    if req.items.iter().any(|item| item.price.is_sign_negative()) {
        return Err(ApiError::bad_request("Item prices must not be negative"));
    }

    let total_amount = order_total(&req.items)?;

    authorize_user(event, state, user_id).await?;

    let mut tx = state.pool.begin().await?;

    let order_id: i32 = sqlx::query_scalar(
        "INSERT INTO orders (user_id, total_amount, delivery_address, status) \
         VALUES ($1, $2, $3, 'pending') RETURNING id",
    )
    .bind(user_id)
    .bind(total_amount)
    .bind(&req.delivery_address)
    .fetch_one(&mut *tx)
    .await?;

    for item in &req.items {
        sqlx::query("INSERT INTO order_items (order_id, plant_id, quantity, price) VALUES ($1, $2, $3, $4)")
            .bind(order_id)
            .bind(item.plant_id)
            .bind(item.quantity)
            .bind(round_price(item.price))
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(order_id, user_id, %total_amount, lines = req.items.len(), "order placed");

    Ok(json!({ "order_id": order_id, "total_amount": total_amount }))
}

/// Admin status change. Any status string is accepted.
pub async fn handle_update_status(event: &Request, state: &AppState) -> Result<Value, ApiError> {
    require_admin_header(event, state).await?;

    let req: UpdateOrderStatusRequest = parse_body_as(event.body())?;
    let (order_id, status) = match (req.order_id, req.status.filter(|s| !s.is_empty())) {
        (Some(id), Some(status)) => (id, status),
        _ => return Err(ApiError::bad_request("Missing order_id or status")),
    };

    if !KNOWN_STATUSES.contains(&status.as_str()) {
        tracing::warn!(order_id, status = %status, "order moved to an unrecognised status");
    }

    let updated: OrderStatus = sqlx::query_as("UPDATE orders SET status = $1 WHERE id = $2 RETURNING id, status")
        .bind(&status)
        .bind(order_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    tracing::info!(order_id, status = %updated.status, "order status changed");
    to_json(&updated)
}
