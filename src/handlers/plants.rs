//! Plant catalog handlers. Reads are public, writes need the admin password.
use lambda_http::{Body, Request, Response};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::auth::require_admin;
use crate::db_utils::AppState;
use crate::error::ApiError;
use crate::http::{handle_options, parse_body_as, parse_id, query_param, respond, CorsPolicy};
use crate::models::{Plant, PlantRequest};

pub const CORS: CorsPolicy = CorsPolicy {
    methods: "GET, POST, PUT, DELETE, OPTIONS",
    headers: "Content-Type, X-Admin-Password",
};

const PLACEHOLDER_IMAGE_BASE: &str = "https://placehold.co/600x600/e8f5e9/2e7d32";

pub async fn handle_event(event: &Request, state: &AppState) -> Response<Body> {
    let method = event.method().as_str();
    match method {
        "OPTIONS" => return handle_options(&CORS),
        "GET" => {
            let result = match query_param(event, "id") {
                Some(raw) => match parse_id(&raw, "id") {
                    Ok(id) => handle_get_plant(id, &state.pool).await,
                    Err(e) => Err(e),
                },
                None => handle_list_plants(&state.pool).await,
            };
            return respond(200, result);
        }
        "POST" | "PUT" | "DELETE" => {}
        other => return ApiError::MethodNotAllowed(other.to_string()).into_response(),
    }

    if let Err(e) = require_admin(event, state).await {
        return e.into_response();
    }

    match method {
        "POST" => {
            let result = match parse_body_as::<PlantRequest>(event.body()) {
                Ok(req) => handle_create_plant(req, state).await,
                Err(e) => Err(e),
            };
            respond(201, result)
        }
        "PUT" => {
            let result = match parse_body_as::<PlantRequest>(event.body()) {
                Ok(req) => handle_update_plant(req, &state.pool).await,
                Err(e) => Err(e),
            };
            respond(200, result)
        }
        _ => {
            let result = match query_param(event, "id") {
                Some(raw) => match parse_id(&raw, "id") {
                    Ok(id) => handle_delete_plant(id, &state.pool).await,
                    Err(e) => Err(e),
                },
                None => Err(ApiError::bad_request("id is required")),
            };
            respond(200, result)
        }
    }
}

/// Placeholder picture labelled with the plant name
pub fn placeholder_image_url(name: &str) -> String {
    format!("{}?text={}", PLACEHOLDER_IMAGE_BASE, urlencoding::encode(name.trim()))
}

/// Validated column values for an insert or full overwrite
#[derive(Debug, PartialEq)]
pub struct PlantFields {
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub image: String,
    pub description: String,
}

impl PlantFields {
    pub fn from_request(req: PlantRequest, placeholder_images: bool) -> Result<Self, ApiError> {
        let name = req
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("name is required"))?;
        let price = req.price.ok_or_else(|| ApiError::bad_request("price is required"))?;
        if price.is_sign_negative() && !price.is_zero() {
            return Err(ApiError::bad_request("price must not be negative"));
        }

        let mut image = req.image.unwrap_or_default();
        if placeholder_images && image.trim().is_empty() {
            image = placeholder_image_url(&name);
        }

        Ok(PlantFields {
            name,
            price,
            category: req.category.unwrap_or_default(),
            image,
            description: req.description.unwrap_or_default(),
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(format!("Failed to serialize plant: {}", e)))
}

pub async fn handle_list_plants(pool: &PgPool) -> Result<Value, ApiError> {
    let plants: Vec<Plant> = sqlx::query_as("SELECT * FROM plants ORDER BY id")
        .fetch_all(pool)
        .await?;
    to_json(&plants)
}

/// The plant, or JSON `null` with a 200 when the id is unknown
pub async fn handle_get_plant(id: i32, pool: &PgPool) -> Result<Value, ApiError> {
    let plant: Option<Plant> = sqlx::query_as("SELECT * FROM plants WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    to_json(&plant)
}

pub async fn handle_create_plant(req: PlantRequest, state: &AppState) -> Result<Value, ApiError> {
    let fields = PlantFields::from_request(req, state.config.placeholder_images)?;

    let plant: Plant = sqlx::query_as(
        "INSERT INTO plants (name, price, category, image, description) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(&fields.name)
    .bind(fields.price)
    .bind(&fields.category)
    .bind(&fields.image)
    .bind(&fields.description)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(plant_id = plant.id, name = %plant.name, "plant created");
    to_json(&plant)
}

/// Full overwrite of the editable columns; `null` when the id is unknown.
pub async fn handle_update_plant(req: PlantRequest, pool: &PgPool) -> Result<Value, ApiError> {
    let id = req.id.ok_or_else(|| ApiError::bad_request("id is required"))?;
    let fields = PlantFields::from_request(req, false)?;

    let plant: Option<Plant> = sqlx::query_as(
        "UPDATE plants \
         SET name = $1, price = $2, category = $3, image = $4, description = $5, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $6 RETURNING *",
    )
    .bind(&fields.name)
    .bind(fields.price)
    .bind(&fields.category)
    .bind(&fields.image)
    .bind(&fields.description)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    if plant.is_some() {
        tracing::info!(plant_id = id, "plant updated");
    }
    to_json(&plant)
}

pub async fn handle_delete_plant(id: i32, pool: &PgPool) -> Result<Value, ApiError> {
    sqlx::query("DELETE FROM plants WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(json!({ "success": true }))
}
