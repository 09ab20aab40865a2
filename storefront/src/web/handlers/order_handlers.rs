// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{NewOrder, NewOrderItem, ShippingAddress};
use crate::pipelines::contexts::CreateOrderCtxData;
use crate::state::AppState;
use crate::store::OrderFilter;
use crate::web::extractors::AuthContext;
use ochre_flow::ContextData;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
  pub cart_items: Vec<NewOrderItem>,
  pub total_amount: Decimal,
  pub shipping_address: ShippingAddress,
  pub payment_method: String,
  #[serde(default)]
  pub idempotency_key: Option<String>,
}

#[instrument(name = "handler::create_order", skip(app_state, req_payload, auth), fields(user_id = %auth.user_id))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CreateOrderRequest>,
  auth: AuthContext,
) -> Result<HttpResponse, AppError> {
  let body = req_payload.into_inner();
  let ctx_data = ContextData::new(CreateOrderCtxData {
    app_state: app_state.get_ref().clone(),
    request: NewOrder {
      user_id: auth.user_id,
      items: body.cart_items,
      total_amount: body.total_amount,
      shipping_address: body.shipping_address,
      payment_method: body.payment_method.trim().to_string(),
      idempotency_key: body.idempotency_key.filter(|k| !k.trim().is_empty()),
    },
    created_order: None,
  });

  app_state.flows.run(ctx_data.clone()).await?;
  let order = ctx_data
    .read()
    .created_order
    .clone()
    .ok_or_else(|| AppError::Internal("order pipeline finished without an order".to_string()))?;
  info!(order_id = %order.id, "Order created via API.");
  Ok(HttpResponse::Created().json(json!({ "order": order })))
}

#[instrument(name = "handler::list_my_orders", skip(app_state, auth), fields(user_id = %auth.user_id))]
pub async fn list_my_orders_handler(
  app_state: web::Data<AppState>,
  auth: AuthContext,
) -> Result<HttpResponse, AppError> {
  let filter = OrderFilter {
    user_id: Some(auth.user_id),
    status: None,
  };
  let orders = app_state
    .bounded("orders.list_orders", app_state.orders.list_orders(filter))
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::get_my_order", skip(app_state, auth), fields(user_id = %auth.user_id))]
pub async fn get_my_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth: AuthContext,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order = app_state
    .bounded("orders.get_order", app_state.orders.get_order(order_id))
    .await?
    .filter(|o| o.user_id == auth.user_id)
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}
