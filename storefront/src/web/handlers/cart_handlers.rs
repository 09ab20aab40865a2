// storefront/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::NewCartItem;
use crate::money;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::state::AppState;
use crate::web::extractors::AuthContext;
use ochre_flow::{ContextData, PipelineResult};

#[instrument(name = "handler::get_cart", skip(app_state, auth), fields(user_id = %auth.user_id))]
pub async fn get_cart_handler(app_state: web::Data<AppState>, auth: AuthContext) -> Result<HttpResponse, AppError> {
  let items = app_state
    .bounded("carts.cart_items", app_state.carts.cart_items(auth.user_id))
    .await?;
  let total = money::sum_amounts(items.iter().map(|i| money::line_total(i.price, i.quantity)))?;
  Ok(HttpResponse::Ok().json(json!({ "items": items, "total": total })))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload, auth),
  fields(user_id = %auth.user_id, product_id = %req_payload.product_id, quantity = req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<NewCartItem>,
  auth: AuthContext,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(AddToCartCtxData {
    app_state: app_state.get_ref().clone(),
    user_id: auth.user_id,
    item: req_payload.into_inner(),
    updated_cart_item: None,
  });

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let line = ctx_data
        .read()
        .updated_cart_item
        .clone()
        .ok_or_else(|| AppError::Internal("cart pipeline finished without a cart line".to_string()))?;
      info!(cart_item_id = %line.id, "Item added to cart.");
      Ok(HttpResponse::Created().json(json!({ "cart_item": line })))
    }
    PipelineResult::Stopped => {
      warn!("Add to cart pipeline stopped early.");
      Err(AppError::Internal("Cart update did not complete".to_string()))
    }
  }
}

#[instrument(name = "handler::remove_cart_item", skip(app_state, auth), fields(user_id = %auth.user_id))]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth: AuthContext,
) -> Result<HttpResponse, AppError> {
  let item_id = path.into_inner();
  let removed = app_state
    .bounded("carts.remove_item", app_state.carts.remove_item(auth.user_id, item_id))
    .await?;
  if removed {
    Ok(HttpResponse::NoContent().finish())
  } else {
    Err(AppError::NotFound(format!("Cart item {} not found", item_id)))
  }
}
