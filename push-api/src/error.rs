use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use push_core::{ObjectResponse, PushError};
use tracing::{debug, error, warn};

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Push(PushError),
}

impl From<PushError> for ApiError {
    fn from(err: PushError) -> Self {
        ApiError::Push(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Push(PushError::invalid_input(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Unauthorized(msg) => {
                debug!("Unauthorized: {}", msg);
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
            }
            ApiError::Push(err) => {
                let code = err.code();
                match err {
                    PushError::InvalidInput(msg) => {
                        debug!("Invalid input: {}", msg);
                        (StatusCode::BAD_REQUEST, code, msg)
                    }
                    PushError::NotFound(msg) => {
                        debug!("Not found: {}", msg);
                        (StatusCode::NOT_FOUND, code, msg)
                    }
                    err @ (PushError::GatewayUnavailable(_) | PushError::GatewayError { .. }) => {
                        warn!("{}", err);
                        (StatusCode::BAD_GATEWAY, code, err.to_string())
                    }
                    err => {
                        error!("Internal server error: {:#}", err);
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            code,
                            "Internal server error".to_string(),
                        )
                    }
                }
            }
        };

        (status, Json(ObjectResponse::error(code, message))).into_response()
    }
}
