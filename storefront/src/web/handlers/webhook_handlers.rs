// storefront/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::pipelines::contexts::WebhookCtxData;
use crate::state::AppState;
use ochre_flow::ContextData;

pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Takes the body as raw bytes: the signature covers the exact bytes sent.
#[instrument(name = "handler::paystack_webhook", skip(app_state, req, body), fields(body_len = body.len()))]
pub async fn paystack_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let signature = req
    .headers()
    .get(SIGNATURE_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::to_string);

  let ctx_data = ContextData::new(WebhookCtxData {
    app_state: app_state.get_ref().clone(),
    raw_body: body,
    signature,
    event: None,
    charge: None,
    acknowledged: false,
  });

  app_state.flows.run(ctx_data.clone()).await?;
  let guard = ctx_data.read();
  info!(event = ?guard.event, acknowledged = guard.acknowledged, "Webhook processed.");
  Ok(HttpResponse::Ok().json(json!({ "received": true })))
}
