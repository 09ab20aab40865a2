// storefront/src/pipelines/contexts.rs

//! Context structs the pipelines run over. Handlers receive them wrapped in
//! `ochre_flow::ContextData`; each struct carries `AppState` so handlers can
//! reach stores, the gateway and config.

use crate::models::{CartItem, ConfirmOutcome, NewCartItem, NewOrder, Order, PaymentRecord, ShippingAddress};
use crate::services::checkout::GatewayHandoff;
use crate::services::paystack::{GatewayInit, GatewayTransaction};
use crate::state::AppState;
use actix_web::web::Bytes;
use ochre_flow::ContextData;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub item: NewCartItem,
  pub updated_cart_item: Option<CartItem>,
}

#[derive(Clone)]
pub struct CreateOrderCtxData {
  pub app_state: AppState,
  pub request: NewOrder,
  pub created_order: Option<Order>,
}

/// Payment initialization for an existing order.
#[derive(Clone)]
pub struct PaymentInitCtxData {
  pub app_state: AppState,
  pub order_id: Uuid,
  pub email: String,
  /// Major units, as entered by the customer.
  pub amount: Decimal,
  /// When set, the order must belong to this user.
  pub requested_by: Option<Uuid>,
  pub order: Option<Order>,
  pub gateway_init: Option<GatewayInit>,
  pub record: Option<PaymentRecord>,
}

#[derive(Clone)]
pub struct PaymentVerifyCtxData {
  pub app_state: AppState,
  pub reference: String,
  pub transaction: Option<GatewayTransaction>,
  pub record: Option<PaymentRecord>,
  pub confirmation: Option<ConfirmOutcome>,
}

impl PaymentVerifyCtxData {
  pub fn new(app_state: AppState, reference: impl Into<String>) -> Self {
    Self {
      app_state,
      reference: reference.into(),
      transaction: None,
      record: None,
      confirmation: None,
    }
  }
}

#[derive(Clone)]
pub struct WebhookCtxData {
  pub app_state: AppState,
  pub raw_body: Bytes,
  pub signature: Option<String>,
  pub event: Option<String>,
  /// Set by parsing when the event is `charge.success`.
  pub charge: Option<ContextData<ChargeEventCtxData>>,
  pub acknowledged: bool,
}

/// Sub-context of the `charge.success` branch.
#[derive(Clone)]
pub struct ChargeEventCtxData {
  pub app_state: AppState,
  pub transaction: GatewayTransaction,
  pub record: Option<PaymentRecord>,
  pub confirmation: Option<ConfirmOutcome>,
  pub cart_cleared: bool,
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub shipping: ShippingAddress,
  pub payment_method: String,
  pub idempotency_key: String,
  pub cart_snapshot: Vec<CartItem>,
  pub order: Option<Order>,
  pub gateway_init: Option<GatewayInit>,
  pub handoff: Option<GatewayHandoff>,
}
