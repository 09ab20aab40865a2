// storefront/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::money::to_major_units;
use crate::pipelines::contexts::{PaymentInitCtxData, PaymentVerifyCtxData};
use crate::state::AppState;
use crate::web::extractors::AuthContext;
use ochre_flow::{ContextData, PipelineResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentRequest {
  #[serde(default)]
  pub email: String,
  pub amount: Decimal,
  #[serde(alias = "order_id")]
  pub order_id: Uuid,
}

#[instrument(
  name = "handler::initialize_payment",
  skip(app_state, req_payload, auth),
  fields(user_id = %auth.user_id, order_id = %req_payload.order_id)
)]
pub async fn initialize_payment_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<InitializePaymentRequest>,
  auth: AuthContext,
) -> Result<HttpResponse, AppError> {
  let body = req_payload.into_inner();
  let ctx_data = ContextData::new(PaymentInitCtxData {
    app_state: app_state.get_ref().clone(),
    order_id: body.order_id,
    email: body.email,
    amount: body.amount,
    requested_by: Some(auth.user_id),
    order: None,
    gateway_init: None,
    record: None,
  });

  app_state.flows.run(ctx_data.clone()).await?;
  let (init, recorded) = {
    let guard = ctx_data.read();
    (guard.gateway_init.clone(), guard.record.is_some())
  };
  let init = init.ok_or_else(|| AppError::Internal("payment initialization returned no transaction".to_string()))?;
  if !recorded {
    warn!(reference = %init.reference, "Gateway transaction initialized without a local payment record.");
  }
  info!(reference = %init.reference, "Payment initialized.");

  Ok(HttpResponse::Ok().json(json!({
    "reference": init.reference,
    "authorization_url": init.authorization_url,
    "access_code": init.access_code,
    "data": init.raw,
  })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
  #[serde(default)]
  pub reference: String,
}

#[instrument(name = "handler::verify_payment", skip(app_state, query), fields(reference = %query.reference))]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  query: web::Query<VerifyQuery>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(PaymentVerifyCtxData::new(
    app_state.get_ref().clone(),
    query.into_inner().reference,
  ));

  let result = app_state.flows.run(ctx_data.clone()).await?;
  let guard = ctx_data.read();
  let transaction = guard
    .transaction
    .as_ref()
    .ok_or_else(|| AppError::Internal("verification finished without a gateway result".to_string()))?;

  if result == PipelineResult::Stopped {
    info!(reference = %transaction.reference, "Verified a reference with no local payment record.");
  }

  Ok(HttpResponse::Ok().json(json!({
    "reference": transaction.reference,
    "status": transaction.status,
    "amount": to_major_units(transaction.amount_minor),
    "currency": transaction.currency,
    "confirmed": guard.confirmation.is_some(),
    "record_found": guard.record.is_some(),
    "order_status": guard.confirmation.as_ref().map(|c| c.order().status),
    "transaction": transaction.raw,
  })))
}
