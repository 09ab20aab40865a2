// storefront/src/services/confirmation.rs

//! The state transition applied when the gateway reports a charge, shared by
//! the client verify path and the webhook path.

use crate::errors::Result;
use crate::models::{ConfirmOutcome, PaymentRecord};
use crate::money::to_minor_units;
use crate::services::paystack::GatewayTransaction;
use crate::state::AppState;
use tracing::{error, info, instrument};

/// Stores the gateway's view on the payment record. `None` when no record exists for the reference.
#[instrument(name = "confirmation::record_gateway_status", skip_all, fields(reference = %transaction.reference, status = ?transaction.status))]
pub async fn record_gateway_status(
  state: &AppState,
  transaction: &GatewayTransaction,
) -> Result<Option<PaymentRecord>> {
  state
    .bounded(
      "payments.record_verification",
      state
        .payments
        .record_verification(&transaction.reference, transaction.status, transaction.raw.clone()),
    )
    .await
}

/// Confirms the order behind `record` when the charge succeeded for the amount
/// that was initialized. Returns `None` when nothing was confirmed.
#[instrument(name = "confirmation::confirm_order_payment", skip_all, fields(reference = %transaction.reference, order_id = %record.order_id))]
pub async fn confirm_order_payment(
  state: &AppState,
  record: &PaymentRecord,
  transaction: &GatewayTransaction,
) -> Result<Option<ConfirmOutcome>> {
  if !transaction.status.is_success() {
    info!("Transaction is not successful; order left unchanged.");
    return Ok(None);
  }

  let expected_minor = to_minor_units(record.amount)?;
  if transaction.amount_minor != expected_minor {
    error!(
      expected_minor,
      reported_minor = transaction.amount_minor,
      "Charged amount differs from the initialized amount; order left for manual review."
    );
    return Ok(None);
  }

  let outcome = state
    .bounded(
      "orders.confirm_payment",
      state.orders.confirm_payment(record.order_id, &transaction.reference),
    )
    .await?;
  match &outcome {
    ConfirmOutcome::Applied(order) => info!(order_number = %order.order_number, status = %order.status, "Order payment confirmed."),
    ConfirmOutcome::AlreadyConfirmed(_) => info!("Order payment was already confirmed."),
  }
  Ok(Some(outcome))
}
