// storefront/src/pipelines/payment_verify_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::PaymentVerifyCtxData;
use crate::services::confirmation;
use ochre_flow::{ContextData, Pipeline, PipelineControl, PipelineRegistry, SkipCondition};
use std::sync::Arc;
use tracing::{info, warn};

/// Gateway references are alphanumeric plus a few separators. Anything else
/// never reaches the gateway URL.
pub fn is_valid_reference(reference: &str) -> bool {
  !reference.is_empty()
    && reference.len() <= 100
    && reference
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '='))
}

/// Client-driven verification of a gateway reference.
///
/// A missing payment record stops the run after the gateway call: the caller
/// still gets the gateway's answer but nothing local changes.
pub fn register_payment_verify_pipeline(registry: &Arc<PipelineRegistry<AppError>>) {
  let charge_not_successful: SkipCondition<PaymentVerifyCtxData> =
    Arc::new(|ctx_data: ContextData<PaymentVerifyCtxData>| {
      !ctx_data
        .read()
        .transaction
        .as_ref()
        .map_or(false, |t| t.status.is_success())
    });

  let mut p = Pipeline::<PaymentVerifyCtxData, AppError>::new(&[
    ("validate_reference", false, None),
    ("call_gateway_verify", false, None),
    ("load_payment_record", false, None),
    ("update_payment_record", true, None),
    ("confirm_order_payment", false, Some(charge_not_successful)),
  ]);

  p.on_root("validate_reference", |ctx_data: ContextData<PaymentVerifyCtxData>| {
    Box::pin(async move {
      let (app_state, reference) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.reference.trim().to_string())
      };
      if reference.is_empty() {
        return Err(AppError::Validation("reference is required".to_string()));
      }
      if !is_valid_reference(&reference) {
        return Err(AppError::Validation("reference contains invalid characters".to_string()));
      }
      app_state.config.require_paystack_secret()?;
      ctx_data.write().reference = reference;
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("call_gateway_verify", |ctx_data: ContextData<PaymentVerifyCtxData>| {
    Box::pin(async move {
      let (app_state, reference) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.reference.clone())
      };
      let transaction = app_state
        .bounded("gateway.verify", app_state.gateway.verify(&reference))
        .await?;
      info!(%reference, status = ?transaction.status, "Gateway verification received.");
      ctx_data.write().transaction = Some(transaction);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("load_payment_record", |ctx_data: ContextData<PaymentVerifyCtxData>| {
    Box::pin(async move {
      let (app_state, reference) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.reference.clone())
      };
      let record = app_state
        .bounded("payments.find_by_reference", app_state.payments.find_by_reference(&reference))
        .await?;
      match record {
        Some(record) => {
          ctx_data.write().record = Some(record);
          Ok::<_, AppError>(PipelineControl::Continue)
        }
        None => {
          warn!(%reference, "No payment record for verified reference; nothing to reconcile locally.");
          Ok(PipelineControl::Stop)
        }
      }
    })
  });

  p.on_root("update_payment_record", |ctx_data: ContextData<PaymentVerifyCtxData>| {
    Box::pin(async move {
      let (app_state, transaction) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.transaction.clone())
      };
      let Some(transaction) = transaction else {
        return Ok(PipelineControl::Continue);
      };
      if let Some(updated) = confirmation::record_gateway_status(&app_state, &transaction).await? {
        ctx_data.write().record = Some(updated);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("confirm_order_payment", |ctx_data: ContextData<PaymentVerifyCtxData>| {
    Box::pin(async move {
      let (app_state, transaction, record) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.transaction.clone(), guard.record.clone())
      };
      let (Some(transaction), Some(record)) = (transaction, record) else {
        return Err(AppError::Internal("verify state incomplete before confirmation".to_string()));
      };
      let outcome = confirmation::confirm_order_payment(&app_state, &record, &transaction).await?;
      ctx_data.write().confirmation = outcome;
      Ok(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
}
