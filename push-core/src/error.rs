use thiserror::Error;

/// Errors raised by the push gateway core and services.
#[derive(Debug, Error)]
pub enum PushError {
    /// Request payload missing or structurally invalid. Nothing was mutated.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The activation server could not be reached or returned no data.
    #[error("Activation gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The activation server answered with an error envelope.
    #[error("Activation gateway error: {code} - {message}")]
    GatewayError { code: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PushError {
    /// Machine readable error code used in the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            PushError::InvalidInput(_) => "INVALID_INPUT",
            PushError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            PushError::GatewayError { .. } => "GATEWAY_ERROR",
            PushError::NotFound(_) => "NOT_FOUND",
            PushError::Database(_) | PushError::Pool(_) | PushError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        PushError::InvalidInput(message.into())
    }
}

pub type PushResult<T> = Result<T, PushError>;
