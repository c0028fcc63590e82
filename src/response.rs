//! JSON response envelopes and the CORS policy applied to them.
//!
//! Every admin API answer has the same shape:
//!
//! ```json
//! { "success": true, "code": 0, "message": "success", "data": null }
//! ```

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Code carried by successful responses.
pub const SUCCESS_CODE: i64 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub code: i64,
    pub message: String,
    pub data: Value,
}

/// Successful envelope with code [`SUCCESS_CODE`].
pub fn success(message: impl Into<String>, data: Value) -> ApiResponse {
    ApiResponse {
        success: true,
        code: SUCCESS_CODE,
        message: message.into(),
        data,
    }
}

/// Error envelope.
pub fn error(message: impl Into<String>, code: i64, data: Value) -> ApiResponse {
    ApiResponse {
        success: false,
        code,
        message: message.into(),
        data,
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        axum::Json(self).into_response()
    }
}

/// Cross-origin headers added to JSON responses.
///
/// Field names match the host `response.json` config block so it can be
/// deserialized directly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub is_allow_origin: bool,
    pub allow_origin: String,
    pub allow_credentials: bool,
    /// Seconds; `0` leaves the header out.
    pub max_age: u64,
    pub allow_methods: String,
    pub allow_headers: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            is_allow_origin: false,
            allow_origin: "*".into(),
            allow_credentials: false,
            max_age: 0,
            allow_methods: "GET,POST,PATCH,PUT,DELETE,OPTIONS".into(),
            allow_headers: "X-Requested-With,Content-Type,Accept,Authorization".into(),
        }
    }
}

impl CorsConfig {
    /// Write the `Access-Control-*` headers into `headers`.  Does nothing
    /// unless `is_allow_origin` is set.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if !self.is_allow_origin {
            return;
        }

        insert(headers, ACCESS_CONTROL_ALLOW_ORIGIN, &self.allow_origin);
        if self.allow_credentials {
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
        if self.max_age > 0 {
            headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(self.max_age));
        }
        insert(headers, ACCESS_CONTROL_ALLOW_METHODS, &self.allow_methods);
        insert(headers, ACCESS_CONTROL_ALLOW_HEADERS, &self.allow_headers);
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if value.is_empty() {
        return;
    }
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => warn!(header = %name, "skipping invalid cors header value"),
    }
}

/// Builds envelope responses with the configured CORS headers.
///
/// Build once from config and hand it to handlers (e.g. through router
/// state).
#[derive(Debug, Clone, Default)]
pub struct JsonResponder {
    cors: CorsConfig,
}

impl JsonResponder {
    pub fn new(cors: CorsConfig) -> Self {
        Self { cors }
    }

    pub fn cors(&self) -> &CorsConfig {
        &self.cors
    }

    /// Render `body` with `status` and the CORS headers.
    pub fn json(&self, status: StatusCode, body: ApiResponse) -> Response {
        let mut resp = (status, axum::Json(body)).into_response();
        self.cors.apply(resp.headers_mut());
        resp
    }

    pub fn success(&self, message: impl Into<String>, data: Value) -> Response {
        self.json(StatusCode::OK, success(message, data))
    }

    pub fn error(&self, message: impl Into<String>, code: i64, data: Value) -> Response {
        self.json(StatusCode::OK, error(message, code, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_shape() {
        let body = success("fetched", json!({ "id": 1 }));
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "success": true, "code": 0, "message": "fetched", "data": { "id": 1 } })
        );
    }

    #[test]
    fn error_envelope_shape() {
        let body = error("denied", 403, Value::Null);
        assert!(!body.success);
        assert_eq!(body.code, 403);
        assert_eq!(body.data, Value::Null);
    }

    #[test]
    fn cors_disabled_adds_nothing() {
        let mut headers = HeaderMap::new();
        CorsConfig::default().apply(&mut headers);
        assert!(headers.is_empty());
    }

    #[test]
    fn cors_enabled_adds_headers() {
        let cors = CorsConfig {
            is_allow_origin: true,
            allow_origin: "https://admin.example.com".into(),
            allow_credentials: true,
            max_age: 600,
            ..CorsConfig::default()
        };
        let resp = JsonResponder::new(cors).success("ok", Value::Null);
        let h = resp.headers();
        assert_eq!(h[ACCESS_CONTROL_ALLOW_ORIGIN], "https://admin.example.com");
        assert_eq!(h[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(h[ACCESS_CONTROL_MAX_AGE], "600");
        assert_eq!(h[ACCESS_CONTROL_ALLOW_METHODS], "GET,POST,PATCH,PUT,DELETE,OPTIONS");
    }

    #[test]
    fn invalid_header_value_skipped() {
        let cors = CorsConfig {
            is_allow_origin: true,
            allow_origin: "bad\nvalue".into(),
            ..CorsConfig::default()
        };
        let mut headers = HeaderMap::new();
        cors.apply(&mut headers);
        assert!(!headers.contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
        assert!(headers.contains_key(ACCESS_CONTROL_ALLOW_HEADERS));
    }

    #[test]
    fn cors_config_from_host_json() {
        let cors: CorsConfig = serde_json::from_value(json!({
            "is_allow_origin": true,
            "allow_origin": "*",
        }))
        .unwrap();
        assert!(cors.is_allow_origin);
        assert_eq!(cors.allow_headers, CorsConfig::default().allow_headers);
    }
}
