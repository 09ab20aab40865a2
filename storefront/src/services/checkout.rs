// storefront/src/services/checkout.rs

//! Checkout orchestration.
//!
//! `CheckoutSession` is the customer-facing flow
//! `Shipping → Payment → Review → Paying → {Succeeded | Failed | Abandoned}`.
//! `pay` runs the checkout pipeline and hands the customer to the gateway's
//! hosted page; `resume` picks up from the gateway callback.

use crate::errors::{AppError, Result};
use crate::models::{Order, ShippingAddress, TransactionStatus};
use crate::pipelines::contexts::{CheckoutCtxData, PaymentVerifyCtxData};
use crate::state::AppState;
use ochre_flow::{ContextData, PipelineResult};
use serde::Serialize;
use std::fmt;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const SUPPORTED_PAYMENT_METHOD: &str = "paystack";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
  Shipping,
  Payment,
  Review,
  Paying,
  Succeeded,
  Failed,
  Abandoned,
}

impl fmt::Display for CheckoutStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      CheckoutStage::Shipping => "shipping",
      CheckoutStage::Payment => "payment",
      CheckoutStage::Review => "review",
      CheckoutStage::Paying => "paying",
      CheckoutStage::Succeeded => "succeeded",
      CheckoutStage::Failed => "failed",
      CheckoutStage::Abandoned => "abandoned",
    };
    f.write_str(name)
  }
}

/// What the client needs to send the browser to the hosted payment page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayHandoff {
  pub order: Order,
  pub reference: String,
  pub authorization_url: String,
  pub access_code: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub public_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutCompletion {
  pub reference: String,
  pub status: Option<TransactionStatus>,
  pub record_found: bool,
  pub confirmed: bool,
  pub order_id: Option<Uuid>,
  pub cart_cleared: bool,
}

/// Verifies `reference` and, once the order is confirmed, clears its owner's cart.
/// Used by the gateway callback and by `CheckoutSession::resume`.
#[instrument(name = "checkout::complete", skip(state))]
pub async fn complete_checkout(state: &AppState, reference: &str) -> Result<CheckoutCompletion> {
  let verify_ctx = ContextData::new(PaymentVerifyCtxData::new(state.clone(), reference));
  state.flows.run(verify_ctx.clone()).await?;

  let (status, record, confirmation) = {
    let guard = verify_ctx.read();
    (
      guard.transaction.as_ref().map(|t| t.status),
      guard.record.clone(),
      guard.confirmation.clone(),
    )
  };

  let mut completion = CheckoutCompletion {
    reference: reference.trim().to_string(),
    status,
    record_found: record.is_some(),
    confirmed: confirmation.is_some(),
    order_id: record.as_ref().map(|r| r.order_id),
    cart_cleared: false,
  };

  if let Some(outcome) = confirmation {
    let user_id = outcome.order().user_id;
    match state.bounded("carts.clear_cart", state.carts.clear_cart(user_id)).await {
      Ok(removed) => {
        info!(%user_id, removed, "Cart cleared after checkout.");
        completion.cart_cleared = true;
      }
      Err(e) => warn!(%user_id, error = %e, "Could not clear cart after confirmed payment."),
    }
  }
  Ok(completion)
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
  user_id: Uuid,
  stage: CheckoutStage,
  shipping: Option<ShippingAddress>,
  payment_method: Option<String>,
  attempt_token: String,
  handoff: Option<GatewayHandoff>,
  completion: Option<CheckoutCompletion>,
}

impl CheckoutSession {
  /// A new attempt with a fresh idempotency token.
  pub fn new(user_id: Uuid) -> Self {
    Self::with_token(user_id, Uuid::new_v4().to_string())
  }

  /// Resumes an attempt whose token the client already holds; repeated `pay`
  /// calls with the same token resolve to the same order.
  pub fn with_token(user_id: Uuid, attempt_token: String) -> Self {
    Self {
      user_id,
      stage: CheckoutStage::Shipping,
      shipping: None,
      payment_method: None,
      attempt_token,
      handoff: None,
      completion: None,
    }
  }

  pub fn stage(&self) -> CheckoutStage {
    self.stage
  }

  pub fn attempt_token(&self) -> &str {
    &self.attempt_token
  }

  pub fn handoff(&self) -> Option<&GatewayHandoff> {
    self.handoff.as_ref()
  }

  pub fn completion(&self) -> Option<&CheckoutCompletion> {
    self.completion.as_ref()
  }

  fn require(&self, expected: CheckoutStage, action: &str) -> Result<()> {
    if self.stage == expected {
      Ok(())
    } else {
      Err(AppError::InvalidTransition {
        from: self.stage.to_string(),
        action: action.to_string(),
      })
    }
  }

  pub fn submit_shipping(&mut self, address: ShippingAddress) -> Result<()> {
    self.require(CheckoutStage::Shipping, "submit shipping")?;
    let missing = address.missing_fields();
    if !missing.is_empty() {
      return Err(AppError::Validation(format!(
        "Missing shipping fields: {}",
        missing.join(", ")
      )));
    }
    self.shipping = Some(address);
    self.stage = CheckoutStage::Payment;
    Ok(())
  }

  pub fn confirm_payment_method(&mut self, method: &str) -> Result<()> {
    self.require(CheckoutStage::Payment, "confirm payment method")?;
    let method = method.trim().to_ascii_lowercase();
    if method != SUPPORTED_PAYMENT_METHOD {
      return Err(AppError::Validation(format!("Unsupported payment method '{}'", method)));
    }
    self.payment_method = Some(method);
    self.stage = CheckoutStage::Review;
    Ok(())
  }

  pub fn back(&mut self) -> Result<()> {
    self.stage = match self.stage {
      CheckoutStage::Payment => CheckoutStage::Shipping,
      CheckoutStage::Review => CheckoutStage::Payment,
      other => {
        return Err(AppError::InvalidTransition {
          from: other.to_string(),
          action: "go back".to_string(),
        })
      }
    };
    Ok(())
  }

  /// Single attempt: any failure moves the session to `Failed`.
  #[instrument(name = "checkout::pay", skip_all, fields(user_id = %self.user_id))]
  pub async fn pay(&mut self, state: &AppState) -> Result<GatewayHandoff> {
    self.require(CheckoutStage::Review, "pay")?;
    let (Some(shipping), Some(payment_method)) = (self.shipping.clone(), self.payment_method.clone()) else {
      return Err(AppError::Internal("review reached without shipping or payment method".to_string()));
    };
    self.stage = CheckoutStage::Paying;

    let ctx = ContextData::new(CheckoutCtxData {
      app_state: state.clone(),
      user_id: self.user_id,
      shipping,
      payment_method,
      idempotency_key: self.attempt_token.clone(),
      cart_snapshot: Vec::new(),
      order: None,
      gateway_init: None,
      handoff: None,
    });

    let outcome = match state.flows.run(ctx.clone()).await {
      Ok(PipelineResult::Completed) => ctx
        .read()
        .handoff
        .clone()
        .ok_or_else(|| AppError::Internal("checkout finished without a gateway handoff".to_string())),
      Ok(PipelineResult::Stopped) => Err(AppError::Internal("checkout stopped before the gateway handoff".to_string())),
      Err(e) => Err(e),
    };

    match outcome {
      Ok(handoff) => {
        info!(order_id = %handoff.order.id, reference = %handoff.reference, "Customer handed off to the gateway.");
        self.handoff = Some(handoff.clone());
        Ok(handoff)
      }
      Err(e) => {
        warn!(error = %e, "Checkout attempt failed.");
        self.stage = CheckoutStage::Failed;
        Err(e)
      }
    }
  }

  /// Continues after the gateway redirect. The session succeeds only when the
  /// order behind the reference was confirmed.
  pub async fn resume(&mut self, state: &AppState, reference: &str) -> Result<CheckoutCompletion> {
    self.require(CheckoutStage::Paying, "resume")?;
    if let Some(handoff) = &self.handoff {
      if handoff.reference != reference.trim() {
        return Err(AppError::Validation(format!(
          "reference {} does not belong to this checkout",
          reference
        )));
      }
    }

    match complete_checkout(state, reference).await {
      Ok(completion) => {
        self.stage = if completion.confirmed {
          CheckoutStage::Succeeded
        } else {
          CheckoutStage::Failed
        };
        self.completion = Some(completion.clone());
        Ok(completion)
      }
      Err(e) => {
        self.stage = CheckoutStage::Failed;
        Err(e)
      }
    }
  }

  /// The customer closed the gateway page. The order stays pending.
  pub fn abandon(&mut self) -> Result<()> {
    self.require(CheckoutStage::Paying, "abandon")?;
    self.stage = CheckoutStage::Abandoned;
    Ok(())
  }
}
