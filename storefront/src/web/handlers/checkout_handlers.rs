// storefront/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::{Order, ShippingAddress};
use crate::services::checkout::{complete_checkout, CheckoutSession};
use crate::state::AppState;
use crate::web::extractors::AuthContext;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCheckoutRequest {
  pub shipping_address: ShippingAddress,
  pub payment_method: String,
  /// Reusing a token returns the order created by the earlier submission.
  #[serde(default)]
  pub checkout_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCheckoutResponse {
  pub order: Order,
  pub reference: String,
  pub authorization_url: String,
  pub access_code: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub public_key: Option<String>,
  pub checkout_token: String,
}

#[instrument(name = "handler::start_checkout", skip(app_state, req_payload, auth), fields(user_id = %auth.user_id))]
pub async fn start_checkout_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<StartCheckoutRequest>,
  auth: AuthContext,
) -> Result<HttpResponse, AppError> {
  let body = req_payload.into_inner();
  let mut session = match body.checkout_token.filter(|t| !t.trim().is_empty()) {
    Some(token) => CheckoutSession::with_token(auth.user_id, token.trim().to_string()),
    None => CheckoutSession::new(auth.user_id),
  };

  let mut shipping = body.shipping_address;
  if shipping.email.trim().is_empty() {
    if let Some(email) = auth.email.clone() {
      shipping.email = email;
    }
  }

  session.submit_shipping(shipping)?;
  session.confirm_payment_method(&body.payment_method)?;
  let handoff = session.pay(app_state.get_ref()).await?;
  info!(order_id = %handoff.order.id, reference = %handoff.reference, "Checkout handed off to the gateway.");

  Ok(HttpResponse::Ok().json(StartCheckoutResponse {
    order: handoff.order,
    reference: handoff.reference,
    authorization_url: handoff.authorization_url,
    access_code: handoff.access_code,
    public_key: handoff.public_key,
    checkout_token: session.attempt_token().to_string(),
  }))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
  #[serde(default)]
  pub reference: Option<String>,
  /// Paystack sends both `reference` and `trxref` on the redirect.
  #[serde(default)]
  pub trxref: Option<String>,
}

#[instrument(name = "handler::checkout_callback", skip(app_state, query))]
pub async fn checkout_callback_handler(
  app_state: web::Data<AppState>,
  query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, AppError> {
  let query = query.into_inner();
  let reference = query
    .reference
    .or(query.trxref)
    .filter(|r| !r.trim().is_empty())
    .ok_or_else(|| AppError::Validation("reference is required".to_string()))?;

  let completion = complete_checkout(app_state.get_ref(), &reference).await?;
  let status = if completion.confirmed { "succeeded" } else { "pending" };
  Ok(HttpResponse::Ok().json(json!({
    "status": status,
    "order_id": completion.order_id,
    "reference": completion.reference,
    "transaction_status": completion.status,
    "cart_cleared": completion.cart_cleared,
  })))
}
