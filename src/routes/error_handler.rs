use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

use crate::error::{WizError, WizErrorType};

/// JSON body of every failed proxy response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: WizErrorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Map an error to its status and body. Validation failures carry their
/// issue list, taxonomy errors keep their own message, anything else is
/// reported as a generic internal error.
pub fn error_response(err: &WizError) -> (StatusCode, ErrorResponse) {
    match err {
        WizError::Validation { issues } => {
            error!(issues = issues.len(), "Rejected invalid query parameters");
            (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: WizErrorType::InvalidRequest.title().to_string(),
                    message: err.to_string(),
                    error_type: WizErrorType::InvalidRequest,
                    details: Some(json!({ "issues": issues })),
                },
            )
        }
        err if err.is_classified() => {
            let kind = err.kind();
            error!(error_type = %kind, message = %err, "Wiz request failed");
            let status = StatusCode::from_u16(kind.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                ErrorResponse {
                    error: kind.title().to_string(),
                    message: err.to_string(),
                    error_type: kind,
                    details: err.details().cloned(),
                },
            )
        }
        err => {
            error!(error = %err, "Unexpected error while handling request");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Internal Server Error".to_string(),
                    message: "An unexpected error occurred".to_string(),
                    error_type: WizErrorType::ApiError,
                    details: None,
                },
            )
        }
    }
}

impl IntoResponse for WizError {
    fn into_response(self) -> Response {
        let (status, body) = error_response(&self);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationIssue;

    #[test]
    fn test_classified_errors_keep_message_and_status() {
        let (status, body) = error_response(&WizError::forbidden("Access forbidden"));
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.error, "Access Denied");
        assert_eq!(body.message, "Access forbidden");
        assert_eq!(body.error_type, WizErrorType::Forbidden);

        let (status, body) = error_response(&WizError::missing_config("wiz.clientId"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error_type, WizErrorType::MissingConfig);
        assert!(body.message.contains("wiz.clientId"));
    }

    #[test]
    fn test_validation_errors_list_issues() {
        let err = WizError::Validation {
            issues: vec![ValidationIssue::invalid_type("after", "string", "array")],
        };
        let (status, body) = error_response(&err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Invalid Request");
        assert_eq!(body.message, "Invalid query parameters");
        let details = body.details.unwrap();
        assert_eq!(details["issues"][0]["path"][0], "after");
        assert_eq!(details["issues"][0]["code"], "invalid_type");
    }

    #[test]
    fn test_unexpected_errors_are_generic() {
        let err = WizError::Io(std::io::Error::other("disk on fire"));
        let (status, body) = error_response(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "An unexpected error occurred");
        assert_eq!(body.error_type, WizErrorType::ApiError);
        assert!(body.details.is_none());

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "API_ERROR");
        assert!(json.get("details").is_none());
    }
}
