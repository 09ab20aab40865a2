// storefront/src/pipelines/cart_pipeline.rs

use crate::errors::AppError;
use crate::money;
use crate::pipelines::contexts::AddToCartCtxData;
use ochre_flow::{ContextData, Pipeline, PipelineControl, PipelineRegistry};
use std::sync::Arc;
use tracing::{info, warn};

pub fn register_add_to_cart_pipeline(registry: &Arc<PipelineRegistry<AppError>>) {
  let mut p = Pipeline::<AddToCartCtxData, AppError>::new(&[
    ("validate_cart_input", false, None),
    ("add_or_update_cart_item", false, None),
  ]);

  p.on_root("validate_cart_input", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let item = { ctx_data.read().item.clone() };

      if item.product_id.trim().is_empty() {
        return Err(AppError::Validation("productId is required.".to_string()));
      }
      if let Err(e) = money::check_quantity(item.quantity) {
        warn!(quantity = item.quantity, "Add to cart rejected: quantity out of range.");
        return Err(e);
      }
      money::check_amount("Price", item.price)?;
      money::line_total(item.price, item.quantity)?;
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("add_or_update_cart_item", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (app_state, user_id, item) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user_id, guard.item.clone())
      };

      let line = app_state
        .bounded("carts.upsert_item", app_state.carts.upsert_item(user_id, item))
        .await?;
      info!(%user_id, cart_item_id = %line.id, quantity = line.quantity, "Cart line stored.");
      ctx_data.write().updated_cart_item = Some(line);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
}
