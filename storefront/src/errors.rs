// storefront/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use ochre_flow::FlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Webhook signature verification failed")]
  InvalidSignature,

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Checkout cannot {action} while {from}")]
  InvalidTransition { from: String, action: String },

  #[error("Configuration Error: {0}")]
  Config(String),

  /// The gateway answered but rejected the call. `body` is its own error payload.
  #[error("Payment gateway rejected the request (HTTP {status})")]
  Gateway { status: u16, body: serde_json::Value },

  #[error("Upstream service unavailable: {0}")]
  Upstream(String),

  #[error("Upstream call timed out: {0}")]
  UpstreamTimeout(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(db_err) => AppError::Sqlx(db_err),
      Err(other) => AppError::Internal(other.to_string()),
    }
  }
}

impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      AppError::UpstreamTimeout(format!("payment gateway: {}", err))
    } else {
      AppError::Upstream(format!("payment gateway: {}", err))
    }
  }
}

impl From<sqlx::migrate::MigrateError> for AppError {
  fn from(err: sqlx::migrate::MigrateError) -> Self {
    AppError::Internal(format!("Database migration failed: {}", err))
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    match self {
      AppError::Validation(_) | AppError::Auth(_) | AppError::NotFound(_) | AppError::InvalidSignature => {
        tracing::warn!(application_error = %self, "Responding with client error");
      }
      _ => tracing::error!(application_error = %self, "Responding with error"),
    }
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
      AppError::InvalidSignature => HttpResponse::Unauthorized().json(json!({"error": "Invalid signature"})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Conflict(m) => HttpResponse::Conflict().json(json!({"error": m})),
      AppError::InvalidTransition { .. } => HttpResponse::Conflict().json(json!({"error": self.to_string()})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Gateway { body, .. } => {
        HttpResponse::BadGateway().json(json!({"error": "Payment gateway rejected the request", "gateway": body}))
      }
      AppError::Upstream(_) => HttpResponse::BadGateway().json(json!({"error": "Upstream service unavailable"})),
      AppError::UpstreamTimeout(_) => {
        HttpResponse::GatewayTimeout().json(json!({"error": "Upstream service timed out"}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Workflow { source } => {
        tracing::error!(flow_error = ?source, "Workflow error details");
        HttpResponse::InternalServerError().json(json!({"error": "Workflow processing error"}))
      }
      AppError::Internal(_) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred"}))
      }
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
