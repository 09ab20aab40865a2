// storefront/src/web/extractors.rs

use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::signature;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_EMAIL_HEADER: &str = "X-User-Email";
pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Caller identity, established upstream by the auth provider and forwarded as headers.
#[derive(Debug, Clone)]
pub struct AuthContext {
  pub user_id: Uuid,
  pub email: Option<String>,
}

impl FromRequest for AuthContext {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let user_id = req
      .headers()
      .get(USER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| Uuid::parse_str(v.trim()).ok());

    let Some(user_id) = user_id else {
      warn!("AuthContext extractor: missing or invalid X-User-ID header.");
      return ready(Err(AppError::Auth("Authentication required".to_string())));
    };
    let email = req
      .headers()
      .get(USER_EMAIL_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(|v| v.trim().to_string())
      .filter(|v| !v.is_empty());

    ready(Ok(AuthContext { user_id, email }))
  }
}

/// Guard for admin routes: `X-Admin-Token` must equal `ADMIN_API_TOKEN`.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

impl FromRequest for AdminAccess {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
      return ready(Err(AppError::Internal("application state is not configured".to_string())));
    };
    let Some(expected) = state.config.admin_api_token.as_deref() else {
      return ready(Err(AppError::Auth("Admin access is disabled".to_string())));
    };
    let provided = req
      .headers()
      .get(ADMIN_TOKEN_HEADER)
      .and_then(|v| v.to_str().ok())
      .unwrap_or_default();

    if tokens_match(expected, provided) {
      ready(Ok(AdminAccess))
    } else {
      warn!("Admin request rejected: bad or missing token.");
      ready(Err(AppError::Auth("Admin token required".to_string())))
    }
  }
}

/// Compares HMAC tags of both tokens so the check runs in constant time.
fn tokens_match(expected: &str, provided: &str) -> bool {
  signature::sign(expected, expected.as_bytes())
    .and_then(|tag| signature::verify(expected, provided.as_bytes(), &tag))
    .is_ok()
}
