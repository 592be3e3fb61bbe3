use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Deserialize, Serialize, Clone, FromRow, PartialEq)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, FromRow)]
pub struct Plant {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub image: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart row joined to its catalog entry
#[derive(Debug, Deserialize, Serialize, Clone, FromRow)]
pub struct CartLine {
    pub id: i32,
    pub quantity: i32,
    pub plant_id: i32,
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub category: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, FromRow, PartialEq)]
pub struct CartItemQuantity {
    pub id: i32,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Clone, FromRow)]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub total_amount: Decimal,
    pub status: String,
    pub delivery_address: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[sqlx(skip)]
    pub items: Vec<OrderLine>,
}

/// A captured line item. `name` and `image` are `None` once the plant has been
/// removed from the catalog.
#[derive(Debug, Serialize, Clone, FromRow)]
pub struct OrderLine {
    #[serde(skip_serializing)]
    pub order_id: i32,
    pub plant_id: i32,
    pub quantity: i32,
    pub price: Decimal,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Clone, FromRow, PartialEq)]
pub struct OrderStatus {
    pub id: i32,
    pub status: String,
}

#[derive(Debug, FromRow)]
pub struct SiteSetting {
    pub key: String,
    pub value: String,
}

// Request Bodies
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AddToCartRequest {
    pub plant_id: Option<i32>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateCartRequest {
    pub id: Option<i32>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NewOrderItem {
    pub plant_id: i32,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateOrderRequest {
    pub user_id: Option<i32>,
    #[serde(default)]
    pub items: Vec<NewOrderItem>,
    #[serde(default)]
    pub delivery_address: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateOrderStatusRequest {
    pub order_id: Option<i32>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PlantRequest {
    pub id: Option<i32>,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}
