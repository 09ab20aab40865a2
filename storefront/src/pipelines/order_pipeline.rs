// storefront/src/pipelines/order_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::CreateOrderCtxData;
use ochre_flow::{ContextData, Pipeline, PipelineControl, PipelineRegistry};
use std::sync::Arc;
use tracing::{info, warn};

/// Order creation: validate the request, then persist order and items in one write.
pub fn register_create_order_pipeline(registry: &Arc<PipelineRegistry<AppError>>) {
  let mut p = Pipeline::<CreateOrderCtxData, AppError>::new(&[
    ("validate_order_request", false, None),
    ("persist_order", false, None),
  ]);

  p.on_root("validate_order_request", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      let request = { ctx_data.read().request.clone() };
      if let Err(e) = request.validate() {
        warn!(user_id = %request.user_id, error = %e, "Order request rejected.");
        return Err(e);
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("persist_order", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      let (app_state, request) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.request.clone())
      };

      let order = app_state
        .bounded("orders.create_order", app_state.orders.create_order(request))
        .await?;
      info!(order_id = %order.id, order_number = %order.order_number, total = %order.total_amount, "Order created.");
      ctx_data.write().created_order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
}
