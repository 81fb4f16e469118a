//! Shared HTTP utilities for the theme-switch workspace.
//!
//! Provides the structured JSON error bodies used by the api-server.

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Resource not found",
        "bad_request" => "Bad request",
        "invalid_domain_id" => "Invalid domain id",
        "no_domains" => "Zero domain records found; create a domain first",
        "error" | "internal" => "Internal server error",
        _ => code, // Fallback to code as message for unknown codes
    };
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Create a success body carrying a status message and a payload.
///
/// Returns: `{"message": "<message>", "<key>": <payload>}`
pub fn json_message_with(message: &str, key: &str, payload: serde_json::Value) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    body.insert("message".into(), serde_json::Value::from(message));
    body.insert(key.into(), payload);
    serde_json::Value::Object(body)
}
