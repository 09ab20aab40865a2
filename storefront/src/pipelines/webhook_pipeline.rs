// storefront/src/pipelines/webhook_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::{ChargeEventCtxData, WebhookCtxData};
use crate::services::paystack::GatewayTransaction;
use crate::services::{confirmation, signature};
use ochre_flow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineRegistry, SkipCondition};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};

pub const CHARGE_SUCCESS_EVENT: &str = "charge.success";

/// Sub-pipeline for `charge.success`. Every step after the record lookup is
/// skipped when the reference is unknown locally.
fn build_charge_success_pipeline() -> Pipeline<ChargeEventCtxData, AppError> {
  let record_missing: SkipCondition<ChargeEventCtxData> =
    Arc::new(|ctx_data: ContextData<ChargeEventCtxData>| ctx_data.read().record.is_none());
  let nothing_confirmed: SkipCondition<ChargeEventCtxData> =
    Arc::new(|ctx_data: ContextData<ChargeEventCtxData>| ctx_data.read().confirmation.is_none());

  let mut p = Pipeline::<ChargeEventCtxData, AppError>::new(&[
    ("load_payment_record", false, None),
    ("apply_payment_confirmation", true, Some(record_missing)),
    ("clear_customer_cart", true, Some(nothing_confirmed)),
  ]);

  p.on_root("load_payment_record", |ctx_data: ContextData<ChargeEventCtxData>| {
    Box::pin(async move {
      let (app_state, reference) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.transaction.reference.clone())
      };
      let record = app_state
        .bounded("payments.find_by_reference", app_state.payments.find_by_reference(&reference))
        .await?;
      if record.is_none() {
        warn!(%reference, "charge.success for a reference with no payment record.");
      }
      ctx_data.write().record = record;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("apply_payment_confirmation", |ctx_data: ContextData<ChargeEventCtxData>| {
    Box::pin(async move {
      let (app_state, transaction, record) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.transaction.clone(), guard.record.clone())
      };
      let Some(record) = record else {
        return Ok(PipelineControl::Continue);
      };

      let record = match confirmation::record_gateway_status(&app_state, &transaction).await {
        Ok(Some(updated)) => updated,
        Ok(None) => record,
        Err(e) => {
          warn!(reference = %transaction.reference, error = %e, "Could not update payment record from webhook.");
          record
        }
      };
      let outcome = confirmation::confirm_order_payment(&app_state, &record, &transaction).await?;

      let mut guard = ctx_data.write();
      guard.record = Some(record);
      guard.confirmation = outcome;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("clear_customer_cart", |ctx_data: ContextData<ChargeEventCtxData>| {
    Box::pin(async move {
      let (app_state, metadata_user, order_user) = {
        let guard = ctx_data.read();
        (
          guard.app_state.clone(),
          guard.transaction.metadata.user_uuid(),
          guard.confirmation.as_ref().map(|c| c.order().user_id),
        )
      };
      let Some(user_id) = metadata_user.or(order_user) else {
        return Ok(PipelineControl::Continue);
      };
      let removed = app_state
        .bounded("carts.clear_cart", app_state.carts.clear_cart(user_id))
        .await?;
      info!(%user_id, removed, "Cart cleared after confirmed payment.");
      ctx_data.write().cart_cleared = true;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p
}

/// Gateway-pushed events. Signature failure rejects the request before the
/// body is parsed; once accepted, every event is acknowledged and failures
/// while applying it are logged only.
pub fn register_webhook_pipeline(registry: &Arc<PipelineRegistry<AppError>>) {
  let charge_success = Arc::new(build_charge_success_pipeline());

  let mut p = Pipeline::<WebhookCtxData, AppError>::new(&[
    ("verify_webhook_signature", false, None),
    ("parse_webhook_event", false, None),
    ("route_webhook_event", true, None),
    ("acknowledge_webhook_receipt", false, None),
  ]);

  p.on_root("verify_webhook_signature", |ctx_data: ContextData<WebhookCtxData>| {
    Box::pin(async move {
      let (app_state, raw_body, provided) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.raw_body.clone(), guard.signature.clone())
      };
      let secret = app_state.config.require_paystack_secret()?;
      let Some(provided) = provided else {
        warn!("Webhook rejected: signature header missing.");
        return Err(AppError::InvalidSignature);
      };
      if let Err(e) = signature::verify(secret, &raw_body, &provided) {
        warn!(body_len = raw_body.len(), "Webhook rejected: signature mismatch.");
        return Err(e);
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("parse_webhook_event", |ctx_data: ContextData<WebhookCtxData>| {
    Box::pin(async move {
      let (app_state, raw_body) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.raw_body.clone())
      };
      let payload: JsonValue = serde_json::from_slice(&raw_body)
        .map_err(|e| AppError::Validation(format!("Webhook body is not valid JSON: {}", e)))?;
      let event = payload
        .get("event")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("Webhook body has no event".to_string()))?;

      let charge = if event == CHARGE_SUCCESS_EVENT {
        let data = payload.get("data").cloned().unwrap_or(JsonValue::Null);
        match GatewayTransaction::from_data(data) {
          Ok(transaction) => {
            info!(reference = %transaction.reference, "charge.success received.");
            Some(ContextData::new(ChargeEventCtxData {
              app_state,
              transaction,
              record: None,
              confirmation: None,
              cart_cleared: false,
            }))
          }
          Err(e) => {
            warn!(error = %e, "charge.success without a usable reference; acknowledging without changes.");
            None
          }
        }
      } else {
        None
      };

      let mut guard = ctx_data.write();
      guard.event = Some(event);
      guard.charge = charge;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.before_root("route_webhook_event", |ctx_data: ContextData<WebhookCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      if guard.charge.is_none() {
        info!(event = ?guard.event, "Webhook event ignored.");
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.branch_step("route_webhook_event")
    .when(
      |ctx_data: ContextData<WebhookCtxData>| ctx_data.read().charge.is_some(),
      charge_success,
      |ctx_data: ContextData<WebhookCtxData>| {
        ctx_data
          .read()
          .charge
          .clone()
          .ok_or_else(|| FlowError::from(anyhow::anyhow!("charge context missing")))
      },
    )
    .otherwise(PipelineControl::Continue)
    .finish();

  p.on_root("acknowledge_webhook_receipt", |ctx_data: ContextData<WebhookCtxData>| {
    Box::pin(async move {
      ctx_data.write().acknowledged = true;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
}
