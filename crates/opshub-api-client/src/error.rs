//! Client error type.
//!
//! Failures are grouped the way the user sees them: transport problems,
//! authorization failures, missing resources and validation errors carrying the
//! server's `detail` payload. Nothing here is retried.

use reqwest::StatusCode;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unauthorized ({status}): {detail}")]
    Unauthorized { status: u16, detail: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed ({status}): {detail}")]
    Validation { status: u16, detail: String },

    #[error("API request failed with status {status}: {detail}")]
    Server { status: u16, detail: String },

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("A news fetch is already running")]
    AlreadyFetching,

    #[error("Not logged in")]
    NotLoggedIn,
}

impl ApiError {
    /// Classify a non-success response by status code.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let detail = extract_detail(body);
        let code = status.as_u16();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized {
                status: code,
                detail,
            },
            StatusCode::NOT_FOUND => ApiError::NotFound(detail),
            StatusCode::BAD_REQUEST
            | StatusCode::CONFLICT
            | StatusCode::PAYLOAD_TOO_LARGE
            | StatusCode::UNSUPPORTED_MEDIA_TYPE
            | StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation {
                status: code,
                detail,
            },
            _ => ApiError::Server {
                status: code,
                detail,
            },
        }
    }

    /// HTTP status, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { status, .. }
            | ApiError::Validation { status, .. }
            | ApiError::Server { status, .. } => Some(*status),
            ApiError::NotFound(_) => Some(404),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. } | ApiError::NotLoggedIn)
    }
}

/// Pull a readable message out of an error body.
///
/// The backend answers `{"detail": "..."}` for handled errors and
/// `{"detail": [{"loc": [...], "msg": "..."}]}` for request validation errors.
/// Anything else is returned as raw text.
pub fn extract_detail(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "Unknown error".to_string();
    }
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return trimmed.to_string();
    };
    match value.get("detail") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => {
            let parts: Vec<String> = items.iter().map(describe_validation_item).collect();
            if parts.is_empty() {
                trimmed.to_string()
            } else {
                parts.join("; ")
            }
        }
        Some(other) => other.to_string(),
        None => trimmed.to_string(),
    }
}

fn describe_validation_item(item: &Value) -> String {
    let msg = item
        .get("msg")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| item.to_string());
    let field = item
        .get("loc")
        .and_then(Value::as_array)
        .and_then(|loc| loc.last())
        .map(|last| match last {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
    match field {
        Some(field) => format!("{}: {}", field, msg),
        None => msg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_detail_is_unwrapped() {
        assert_eq!(
            extract_detail(r#"{"detail":"Incorrect email or password"}"#),
            "Incorrect email or password"
        );
    }

    #[test]
    fn validation_list_is_flattened() {
        let body = r#"{"detail":[
            {"loc":["body","email"],"msg":"value is not a valid email address","type":"value_error"},
            {"loc":["body","password"],"msg":"field required","type":"missing"}
        ]}"#;
        assert_eq!(
            extract_detail(body),
            "email: value is not a valid email address; password: field required"
        );
    }

    #[test]
    fn non_json_and_empty_bodies() {
        assert_eq!(extract_detail("Bad Gateway"), "Bad Gateway");
        assert_eq!(extract_detail("   "), "Unknown error");
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            ApiError::from_response(StatusCode::FORBIDDEN, r#"{"detail":"nope"}"#),
            ApiError::Unauthorized { status: 403, .. }
        ));
        assert!(matches!(
            ApiError::from_response(StatusCode::NOT_FOUND, r#"{"detail":"Training not found"}"#),
            ApiError::NotFound(ref d) if d == "Training not found"
        ));
        assert!(matches!(
            ApiError::from_response(StatusCode::UNSUPPORTED_MEDIA_TYPE, "{}"),
            ApiError::Validation { status: 415, .. }
        ));
        let err = ApiError::from_response(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_unauthorized());
    }
}
