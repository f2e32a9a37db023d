use std::path::PathBuf;
use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unexpected response from {call} request: http_status = {status}, body = {body}")]
    UnexpectedResponse {
        call: String,
        status: u16,
        body: String,
    },

    #[error("Resource not found during {call}: {message}")]
    NotFound { call: String, message: String },

    #[error("Operation failed after {attempts} attempts.")]
    RetryExhausted { attempts: u32 },

    #[error("Malformed response from {call}: missing or invalid field {field}")]
    MalformedResponse { call: String, field: String },

    #[error("Malformed document {}: {reason}", path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Remote call {call} failed: {source}")]
    Gateway {
        call: String,
        #[source]
        source: GatewayError,
    },

    #[error("Object store operation failed: {0}")]
    ObjectStore(String),
}

impl AppError {
    /// Classifies a failed remote call. Not-found faults keep their own variant so
    /// callers can still tell them apart; any other service fault is an unexpected
    /// response. Only failures that never reached the service stay `Gateway`.
    pub fn from_gateway(call: &str, err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound { message, .. } => AppError::NotFound {
                call: call.to_string(),
                message,
            },
            GatewayError::AlreadyExists {
                status,
                code,
                message,
            }
            | GatewayError::InvalidParameter {
                status,
                code,
                message,
            }
            | GatewayError::Service {
                status,
                code,
                message,
            } => AppError::UnexpectedResponse {
                call: call.to_string(),
                status,
                body: format!("{}: {}", code, message),
            },
            other => AppError::Gateway {
                call: call.to_string(),
                source: other,
            },
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
