use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope wrapped around every JSON response the server emits.
///
/// `data` is always present on the wire (as `null` when empty) so clients
/// can rely on a fixed shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    fn new(success: bool, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success,
            message: message.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(true, message, None)
    }

    pub fn success_with(message: impl Into<String>, data: T) -> Self {
        Self::new(true, message, Some(data))
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(false, message, None)
    }

    pub fn fail_with(message: impl Into<String>, data: T) -> Self {
        Self::new(false, message, Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_data_serializes_as_null() {
        let body = serde_json::to_value(ApiResponse::<()>::success("signed up"))
            .unwrap();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("signed up"));
        assert!(body["data"].is_null());
        assert!(body["timestamp"].is_string());
    }

    #[test]
    fn failure_carries_payload() {
        let body = serde_json::to_value(ApiResponse::fail_with(
            "validation failed",
            json!({ "email": "bad" }),
        ))
        .unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["data"]["email"], json!("bad"));
    }
}
