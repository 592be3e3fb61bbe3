//! HTTP utilities for request/response handling and CORS

use lambda_http::{Body, Request, RequestExt, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::ApiError;

/// Per-handler CORS preflight settings
#[derive(Debug, Clone, Copy)]
pub struct CorsPolicy {
    pub methods: &'static str,
    pub headers: &'static str,
}

/// CORS origin header for all responses
pub fn get_cors_origin_header() -> (&'static str, &'static str) {
    ("Access-Control-Allow-Origin", "*")
}

/// Full CORS headers for OPTIONS preflight responses only
pub fn get_cors_preflight_headers(policy: &CorsPolicy) -> Vec<(&'static str, &'static str)> {
    vec![
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", policy.methods),
        ("Access-Control-Allow-Headers", policy.headers),
        ("Access-Control-Max-Age", "86400"),
    ]
}

/// Build an error response with consistent formatting
pub fn error_response(
    status: u16,
    error: &str,
    details: &str,
    suggestion: Option<&str>,
) -> Response<Body> {
    let mut body = json!({
        "error": error,
        "details": details,
    });

    if let Some(suggestion) = suggestion {
        body["suggestion"] = json!(suggestion);
    }

    json_response(status, body.to_string())
}

/// Build a successful response with CORS headers
pub fn success_response(status: u16, body: &Value) -> Response<Body> {
    json_response(status, body.to_string())
}

fn json_response(status: u16, body: String) -> Response<Body> {
    let (key, value) = get_cors_origin_header();
    Response::builder()
        .status(status)
        .header(key, value)
        .header("Content-Type", "application/json")
        .body(body.into())
        .expect("Couldn't create response")
}

/// Handle CORS preflight requests
pub fn handle_options(policy: &CorsPolicy) -> Response<Body> {
    let mut response = Response::builder().status(200);

    for (key, value) in get_cors_preflight_headers(policy) {
        response = response.header(key, value);
    }

    response
        .header("Content-Type", "application/json")
        .body(Body::Empty)
        .expect("Couldn't handle CORS request")
}

/// Turn a handler result into the gateway response
pub fn respond(status: u16, result: Result<Value, ApiError>) -> Response<Body> {
    match result {
        Ok(body) => success_response(status, &body),
        Err(e) => e.into_response(),
    }
}

pub fn parse_json_body(body: &Body) -> Result<Value, ApiError> {
    let body_str = match body {
        Body::Empty => "{}",
        Body::Text(s) if s.trim().is_empty() => "{}",
        Body::Text(s) => s.as_str(),
        Body::Binary(b) => std::str::from_utf8(b)
            .map_err(|_| ApiError::bad_request("Could not parse request body as UTF-8"))?,
        _ => "{}",
    };

    let json: Value = serde_json::from_str(body_str)
        .map_err(|_| ApiError::bad_request("Could not parse request body as JSON"))?;

    if !json.is_object() {
        return Err(ApiError::bad_request("Request body must be a JSON object"));
    }

    Ok(json)
}

/// Deserialize the whole body into a typed request
pub fn parse_body_as<T>(body: &Body) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let json = parse_json_body(body)?;
    serde_json::from_value(json).map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
}

pub fn get_value_in_json<T>(body: &Value, key: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    match body.get(key) {
        Some(Value::Null) | None => Err(ApiError::bad_request(format!("{} is required", key))),
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|_| ApiError::bad_request(format!("{} is not a valid value", key))),
    }
}

/// Header value as a non-empty string. Header names are case-insensitive.
pub fn header<'a>(event: &'a Request, name: &str) -> Option<&'a str> {
    event
        .headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Query string parameter as a non-empty string
pub fn query_param(event: &Request, name: &str) -> Option<String> {
    event
        .query_string_parameters_ref()
        .and_then(|params| params.first(name))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parse a numeric identifier coming from a header or query parameter
pub fn parse_id(raw: &str, name: &str) -> Result<i32, ApiError> {
    raw.parse::<i32>()
        .map_err(|_| ApiError::bad_request(format!("{} must be a number", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const POLICY: CorsPolicy = CorsPolicy {
        methods: "GET, POST, OPTIONS",
        headers: "Content-Type, X-Auth-Token",
    };

    #[test]
    fn test_cors_headers() {
        let headers = get_cors_preflight_headers(&POLICY);
        assert_eq!(headers.len(), 4);
        assert!(headers.iter().any(|(k, v)| *k == "Access-Control-Max-Age" && *v == "86400"));
        assert!(headers.iter().any(|(k, v)| *k == "Access-Control-Allow-Methods" && *v == POLICY.methods));
    }

    #[test]
    fn test_handle_options() {
        let response = handle_options(&POLICY);
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers().get("Access-Control-Allow-Origin").unwrap(), "*");
        assert_eq!(
            response.headers().get("Access-Control-Allow-Headers").unwrap(),
            "Content-Type, X-Auth-Token"
        );
        assert!(matches!(response.body(), Body::Empty));
    }

    #[test]
    fn test_success_response() {
        let response = success_response(201, &json!({"ok": true}));
        assert_eq!(response.status(), 201);
        assert_eq!(response.headers().get("Content-Type").unwrap(), "application/json");
        assert_eq!(response.headers().get("Access-Control-Allow-Origin").unwrap(), "*");
    }

    #[test]
    fn test_error_response_format() {
        let response = error_response(400, "Bad Request", "Invalid input", Some("Check your request"));
        assert_eq!(response.status(), 400);
        let Body::Text(text) = response.body() else { panic!("expected text body") };
        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["error"], "Bad Request");
        assert_eq!(body["suggestion"], "Check your request");
    }

    #[test]
    fn test_parse_json_body() {
        assert_eq!(parse_json_body(&Body::Empty).unwrap(), json!({}));
        assert_eq!(
            parse_json_body(&Body::Text(r#"{"a":1}"#.to_string())).unwrap(),
            json!({"a": 1})
        );
        assert!(parse_json_body(&Body::Text("not json".to_string())).is_err());
        assert!(parse_json_body(&Body::Text("[1,2]".to_string())).is_err());
    }

    #[test]
    fn test_get_value_in_json() {
        let body = json!({"name": "Fern", "price": "oops", "image": null});
        let name: String = get_value_in_json(&body, "name").unwrap();
        assert_eq!(name, "Fern");
        assert!(get_value_in_json::<f64>(&body, "price").is_err());
        assert!(get_value_in_json::<String>(&body, "image").is_err());
        assert!(get_value_in_json::<String>(&body, "missing").is_err());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let event = lambda_http::http::Request::builder()
            .header("x-admin-password", "secret")
            .body(Body::Empty)
            .unwrap();
        assert_eq!(header(&event, "X-Admin-Password"), Some("secret"));
        assert_eq!(header(&event, "X-User-Id"), None);
    }

    #[test]
    fn test_query_param() {
        let event = lambda_http::http::Request::builder()
            .body(Body::Empty)
            .unwrap()
            .with_query_string_parameters(HashMap::from([
                ("id".to_string(), "7".to_string()),
                ("blank".to_string(), "".to_string()),
            ]));
        assert_eq!(query_param(&event, "id").as_deref(), Some("7"));
        assert_eq!(query_param(&event, "blank"), None);
        assert_eq!(query_param(&event, "missing"), None);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42", "id").unwrap(), 42);
        assert!(parse_id("abc", "id").is_err());
    }
}
