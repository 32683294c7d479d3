use serde::{Deserialize, Serialize};

/// What the caller wants done with `value`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Shorten the URL in `value`.
    Post,
    /// Look up the short code in `value`.
    Get,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Body of every call to the gateway.
#[derive(Debug, Deserialize)]
pub struct GatewayRequest {
    #[serde(rename = "type", default)]
    pub kind: RequestKind,
    #[serde(default)]
    pub value: String,
}

/// A successful answer. Serialized without a tag, so the caller sees either
/// `{"id": ...}` or `{"message": ...}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    /// A short code for `post`, the original URL for `get`.
    Id { id: String },
    Message { message: String },
}

impl ApiResponse {
    pub fn id(id: impl Into<String>) -> Self {
        ApiResponse::Id { id: id.into() }
    }

    pub fn invalid_method() -> Self {
        ApiResponse::Message {
            message: "Invalid method".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_kinds() {
        let request: GatewayRequest =
            serde_json::from_value(json!({"type": "post", "value": "https://example.com"}))
                .unwrap();
        assert_eq!(request.kind, RequestKind::Post);
        assert_eq!(request.value, "https://example.com");

        let request: GatewayRequest =
            serde_json::from_value(json!({"type": "get", "value": "r"})).unwrap();
        assert_eq!(request.kind, RequestKind::Get);
    }

    #[test]
    fn unknown_or_missing_kind_is_unknown() {
        let request: GatewayRequest =
            serde_json::from_value(json!({"type": "delete", "value": "r"})).unwrap();
        assert_eq!(request.kind, RequestKind::Unknown);

        let request: GatewayRequest = serde_json::from_value(json!({"value": "r"})).unwrap();
        assert_eq!(request.kind, RequestKind::Unknown);

        // kinds are case sensitive
        let request: GatewayRequest =
            serde_json::from_value(json!({"type": "POST", "value": "r"})).unwrap();
        assert_eq!(request.kind, RequestKind::Unknown);
    }

    #[test]
    fn responses_are_untagged() {
        assert_eq!(
            serde_json::to_value(ApiResponse::id("4yP")).unwrap(),
            json!({"id": "4yP"})
        );
        assert_eq!(
            serde_json::to_value(ApiResponse::invalid_method()).unwrap(),
            json!({"message": "Invalid method"})
        );
    }
}
