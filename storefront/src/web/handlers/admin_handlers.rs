// storefront/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::OrderStatus;
use crate::pipelines::contexts::PaymentVerifyCtxData;
use crate::state::AppState;
use crate::store::OrderFilter;
use crate::web::extractors::AdminAccess;
use ochre_flow::ContextData;

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
  #[serde(default)]
  pub status: Option<String>,
}

#[instrument(name = "handler::admin_list_orders", skip(app_state, _admin))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListOrdersQuery>,
  _admin: AdminAccess,
) -> Result<HttpResponse, AppError> {
  let status = match query.into_inner().status.filter(|s| !s.trim().is_empty()) {
    Some(raw) => Some(OrderStatus::from_str(&raw)?),
    None => None,
  };
  let orders = app_state
    .bounded(
      "orders.list_orders",
      app_state.orders.list_orders(OrderFilter { user_id: None, status }),
    )
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
  pub status: String,
}

/// Fulfillment edits only; payment fields are owned by the confirmation path.
#[instrument(name = "handler::admin_update_order_status", skip(app_state, req_payload, _admin))]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateStatusRequest>,
  _admin: AdminAccess,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let status = OrderStatus::from_str(&req_payload.status)?;
  let order = app_state
    .bounded("orders.update_status", app_state.orders.update_status(order_id, status))
    .await?;
  info!(%order_id, %status, "Order status updated by admin.");
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleOrdersQuery {
  #[serde(default)]
  pub older_than_minutes: Option<i64>,
}

#[instrument(name = "handler::admin_stale_orders", skip(app_state, _admin))]
pub async fn stale_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<StaleOrdersQuery>,
  _admin: AdminAccess,
) -> Result<HttpResponse, AppError> {
  let minutes = query
    .older_than_minutes
    .unwrap_or(app_state.config.stale_order_minutes);
  if minutes < 0 {
    return Err(AppError::Validation("olderThanMinutes cannot be negative".to_string()));
  }
  let window = Duration::try_minutes(minutes)
    .ok_or_else(|| AppError::Validation("olderThanMinutes is out of range".to_string()))?;
  let cutoff = Utc::now() - window;
  let orders = app_state
    .bounded("orders.list_stale_pending", app_state.orders.list_stale_pending(cutoff))
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "older_than_minutes": minutes,
    "orders": orders,
  })))
}

/// Re-verifies every reference recorded for the order against the gateway.
#[instrument(name = "handler::admin_reconcile_order", skip(app_state, _admin))]
pub async fn reconcile_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  _admin: AdminAccess,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  app_state
    .bounded("orders.get_order", app_state.orders.get_order(order_id))
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

  let records = app_state
    .bounded("payments.list_for_order", app_state.payments.list_for_order(order_id))
    .await?;

  let mut results = Vec::with_capacity(records.len());
  for record in records {
    let ctx_data = ContextData::new(PaymentVerifyCtxData::new(app_state.get_ref().clone(), &record.reference));
    match app_state.flows.run(ctx_data.clone()).await {
      Ok(_) => {
        let guard = ctx_data.read();
        results.push(json!({
          "reference": record.reference,
          "status": guard.transaction.as_ref().map(|t| t.status),
          "confirmed": guard.confirmation.is_some(),
        }));
      }
      Err(e) => {
        warn!(reference = %record.reference, error = %e, "Reconciliation of reference failed.");
        results.push(json!({
          "reference": record.reference,
          "error": e.to_string(),
        }));
      }
    }
  }

  let order = app_state
    .bounded("orders.get_order", app_state.orders.get_order(order_id))
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
  Ok(HttpResponse::Ok().json(json!({ "order": order, "references": results })))
}
