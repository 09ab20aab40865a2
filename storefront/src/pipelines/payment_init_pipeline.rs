// storefront/src/pipelines/payment_init_pipeline.rs

use crate::errors::AppError;
use crate::models::NewPaymentRecord;
use crate::money::{check_amount, to_minor_units};
use crate::pipelines::contexts::PaymentInitCtxData;
use crate::services::paystack::{InitializeTransaction, TransactionMetadata};
use ochre_flow::{ContextData, Pipeline, PipelineControl, PipelineRegistry};
use std::sync::Arc;
use tracing::{info, warn};

const PAYMENT_CHANNELS: [&str; 2] = ["card", "bank"];

/// Initializes a gateway transaction for an order. The two bookkeeping steps
/// at the end are optional: their failures are logged and the gateway answer
/// still reaches the caller.
pub fn register_payment_init_pipeline(registry: &Arc<PipelineRegistry<AppError>>) {
  let mut p = Pipeline::<PaymentInitCtxData, AppError>::new(&[
    ("validate_payment_input", false, None),
    ("load_order_for_payment", false, None),
    ("call_gateway_initialize", false, None),
    ("record_payment_attempt", true, None),
    ("mark_order_payment_initialized", true, None),
  ]);

  p.on_root("validate_payment_input", |ctx_data: ContextData<PaymentInitCtxData>| {
    Box::pin(async move {
      let (app_state, email, amount) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.email.clone(), guard.amount)
      };

      if email.trim().is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
      }
      if amount <= rust_decimal::Decimal::ZERO {
        return Err(AppError::Validation("amount must be greater than zero".to_string()));
      }
      check_amount("amount", amount)?;
      app_state.config.require_paystack_secret()?;
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("load_order_for_payment", |ctx_data: ContextData<PaymentInitCtxData>| {
    Box::pin(async move {
      let (app_state, order_id, amount, requested_by) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.order_id, guard.amount, guard.requested_by)
      };

      let order = app_state
        .bounded("orders.get_order", app_state.orders.get_order(order_id))
        .await?
        .filter(|o| requested_by.map_or(true, |user_id| o.user_id == user_id))
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

      if order.is_payment_completed() {
        return Err(AppError::Conflict(format!("Order {} is already paid", order.order_number)));
      }
      if order.total_amount != amount {
        warn!(%order_id, requested = %amount, total = %order.total_amount, "Payment amount differs from the order total.");
        return Err(AppError::Validation(format!(
          "amount {} does not match the order total {}",
          amount, order.total_amount
        )));
      }

      ctx_data.write().order = Some(order);
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("call_gateway_initialize", |ctx_data: ContextData<PaymentInitCtxData>| {
    Box::pin(async move {
      let (app_state, email, amount, order) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.email.clone(), guard.amount, guard.order.clone())
      };
      let order = order.ok_or_else(|| AppError::Internal("order not loaded before initialize".to_string()))?;

      let request = InitializeTransaction {
        email: email.trim().to_string(),
        amount: to_minor_units(amount)?,
        currency: app_state.config.payment_currency.clone(),
        callback_url: app_state.config.payment_callback_url(),
        channels: PAYMENT_CHANNELS.iter().map(|c| c.to_string()).collect(),
        metadata: TransactionMetadata {
          order_id: Some(order.id.to_string()),
          user_id: Some(order.user_id.to_string()),
        },
      };

      let init = app_state
        .bounded("gateway.initialize", app_state.gateway.initialize(&request))
        .await?;
      info!(order_id = %order.id, reference = %init.reference, amount_minor = request.amount, "Gateway transaction initialized.");
      ctx_data.write().gateway_init = Some(init);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("record_payment_attempt", |ctx_data: ContextData<PaymentInitCtxData>| {
    Box::pin(async move {
      let (app_state, order_id, email, amount, init) = {
        let guard = ctx_data.read();
        (
          guard.app_state.clone(),
          guard.order_id,
          guard.email.trim().to_string(),
          guard.amount,
          guard.gateway_init.clone(),
        )
      };
      let Some(init) = init else {
        return Ok(PipelineControl::Continue);
      };

      let record = NewPaymentRecord {
        order_id,
        reference: init.reference.clone(),
        email,
        amount,
        access_code: Some(init.access_code.clone()),
        authorization_url: Some(init.authorization_url.clone()),
        init_payload: init.raw.clone(),
      };
      let stored = app_state
        .bounded("payments.insert_payment", app_state.payments.insert_payment(record))
        .await?;
      ctx_data.write().record = Some(stored);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("mark_order_payment_initialized", |ctx_data: ContextData<PaymentInitCtxData>| {
    Box::pin(async move {
      let (app_state, order_id) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.order_id)
      };
      let changed = app_state
        .bounded(
          "orders.mark_payment_initialized",
          app_state.orders.mark_payment_initialized(order_id),
        )
        .await?;
      if !changed {
        info!(%order_id, "Order payment status was already set; left unchanged.");
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
}
