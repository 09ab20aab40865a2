// storefront/src/pipelines/checkout_pipeline.rs

use crate::errors::AppError;
use crate::models::{NewOrder, NewOrderItem};
use crate::money;
use crate::pipelines::contexts::{CheckoutCtxData, CreateOrderCtxData, PaymentInitCtxData};
use crate::services::checkout::{GatewayHandoff, SUPPORTED_PAYMENT_METHOD};
use ochre_flow::{ContextData, Pipeline, PipelineControl, PipelineRegistry, PipelineResult};
use std::sync::Arc;
use tracing::{info, warn};

/// cart snapshot → order → gateway initialize → handoff. Nothing is rolled
/// back: an initialize failure leaves a pending order for reconciliation.
pub fn register_checkout_pipeline(registry: &Arc<PipelineRegistry<AppError>>) {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("validate_checkout_request", false, None),
    ("snapshot_cart", false, None),
    ("create_order_record", false, None),
    ("initialize_gateway_payment", false, None),
    ("prepare_gateway_handoff", false, None),
  ]);

  p.on_root("validate_checkout_request", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let missing = guard.shipping.missing_fields();
      if !missing.is_empty() {
        return Err(AppError::Validation(format!(
          "Missing shipping fields: {}",
          missing.join(", ")
        )));
      }
      if guard.payment_method != SUPPORTED_PAYMENT_METHOD {
        return Err(AppError::Validation(format!(
          "Unsupported payment method '{}'",
          guard.payment_method
        )));
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("snapshot_cart", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (app_state, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user_id)
      };
      let items = app_state
        .bounded("carts.cart_items", app_state.carts.cart_items(user_id))
        .await?;
      if items.is_empty() {
        warn!(%user_id, "Checkout attempted with an empty cart.");
        return Err(AppError::Validation("Cart is empty".to_string()));
      }
      info!(%user_id, lines = items.len(), "Cart snapshot taken.");
      ctx_data.write().cart_snapshot = items;
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("create_order_record", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (app_state, request) = {
        let guard = ctx_data.read();
        let items: Vec<_> = guard.cart_snapshot.iter().map(|line| line.to_order_item()).collect();
        let total_amount = money::sum_amounts(items.iter().map(NewOrderItem::line_total))?;
        let request = NewOrder {
          user_id: guard.user_id,
          total_amount,
          items,
          shipping_address: guard.shipping.clone(),
          payment_method: guard.payment_method.clone(),
          idempotency_key: Some(guard.idempotency_key.clone()),
        };
        (guard.app_state.clone(), request)
      };

      let order_ctx = ContextData::new(CreateOrderCtxData {
        app_state: app_state.clone(),
        request,
        created_order: None,
      });
      app_state.flows.run(order_ctx.clone()).await?;
      let order = order_ctx
        .read()
        .created_order
        .clone()
        .ok_or_else(|| AppError::Internal("order pipeline finished without an order".to_string()))?;
      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("initialize_gateway_payment", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (app_state, user_id, email, order) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user_id, guard.shipping.email.clone(), guard.order.clone())
      };
      let order = order.ok_or_else(|| AppError::Internal("no order to pay for".to_string()))?;

      let init_ctx = ContextData::new(PaymentInitCtxData {
        app_state: app_state.clone(),
        order_id: order.id,
        email,
        amount: order.total_amount,
        requested_by: Some(user_id),
        order: None,
        gateway_init: None,
        record: None,
      });
      match app_state.flows.run(init_ctx.clone()).await {
        Ok(PipelineResult::Completed) => {}
        Ok(PipelineResult::Stopped) => {
          return Err(AppError::Internal("payment initialization stopped unexpectedly".to_string()));
        }
        Err(e) => {
          warn!(order_id = %order.id, error = %e, "Payment initialization failed; order left pending.");
          return Err(e);
        }
      }
      let init = init_ctx
        .read()
        .gateway_init
        .clone()
        .ok_or_else(|| AppError::Internal("payment initialization returned no transaction".to_string()))?;
      ctx_data.write().gateway_init = Some(init);
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("prepare_gateway_handoff", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let (Some(order), Some(init)) = (guard.order.clone(), guard.gateway_init.clone()) else {
        return Err(AppError::Internal("checkout handoff without order or transaction".to_string()));
      };
      let public_key = guard.app_state.config.paystack_public_key.clone();
      guard.handoff = Some(GatewayHandoff {
        order,
        reference: init.reference,
        authorization_url: init.authorization_url,
        access_code: init.access_code,
        public_key,
      });
      Ok(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
}
