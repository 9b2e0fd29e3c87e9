//! Request/response envelope shared by the push API and the activation server.
//!
//! Requests wrap their payload in `{"requestObject": ...}`; responses carry a
//! `status` of `OK` or `ERROR` and an optional `responseObject`.

use serde::{Deserialize, Serialize};

use crate::error::PushError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRequest<T> {
    #[serde(default = "Option::default")]
    pub request_object: Option<T>,
}

impl<T> ObjectRequest<T> {
    pub fn new(request_object: T) -> Self {
        Self {
            request_object: Some(request_object),
        }
    }

    /// Unwrap the payload, failing with `InvalidInput` when it is absent.
    pub fn into_inner(self) -> Result<T, PushError> {
        self.request_object
            .ok_or_else(|| PushError::invalid_input("Invalid or empty input data"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectResponse<T> {
    pub status: ResponseStatus,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub response_object: Option<T>,
}

impl ObjectResponse<()> {
    /// Empty acknowledgement.
    pub fn ok() -> Self {
        Self {
            status: ResponseStatus::Ok,
            response_object: None,
        }
    }
}

impl<T> ObjectResponse<T> {
    pub fn with(response_object: T) -> Self {
        Self {
            status: ResponseStatus::Ok,
            response_object: Some(response_object),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ObjectResponse<ErrorDetail> {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            response_object: Some(ErrorDetail {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_request_object_is_invalid_input() {
        let request: ObjectRequest<serde_json::Value> = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(request.into_inner(), Err(PushError::InvalidInput(_))));

        let request: ObjectRequest<serde_json::Value> =
            serde_json::from_value(json!({ "requestObject": null })).unwrap();
        assert!(matches!(request.into_inner(), Err(PushError::InvalidInput(_))));
    }

    #[test]
    fn test_ok_response_has_no_response_object() {
        let body = serde_json::to_value(ObjectResponse::ok()).unwrap();
        assert_eq!(body, json!({ "status": "OK" }));
    }

    #[test]
    fn test_error_response_shape() {
        let body = serde_json::to_value(ObjectResponse::error("INVALID_INPUT", "bad")).unwrap();
        assert_eq!(
            body,
            json!({
                "status": "ERROR",
                "responseObject": { "code": "INVALID_INPUT", "message": "bad" }
            })
        );
    }
}
