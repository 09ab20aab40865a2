// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type as SqlxType;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::order_item::{NewOrderItem, OrderItem};
use super::shipping::ShippingAddress;
use crate::errors::{AppError, Result};
use crate::money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Paid,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Processing => "processing",
      OrderStatus::Paid => "paid",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "pending" => Ok(OrderStatus::Pending),
      "processing" => Ok(OrderStatus::Processing),
      "paid" => Ok(OrderStatus::Paid),
      "shipped" => Ok(OrderStatus::Shipped),
      "delivered" => Ok(OrderStatus::Delivered),
      "cancelled" => Ok(OrderStatus::Cancelled),
      other => Err(AppError::Validation(format!("Unknown order status '{}'", other))),
    }
  }
}

/// Local view of the payment, independent of `OrderStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Initialized,
  Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
  pub id: Uuid,
  pub order_number: String,
  pub user_id: Uuid,
  pub total_amount: Decimal,
  pub status: OrderStatus,
  pub payment_status: Option<PaymentStatus>,
  pub payment_reference: Option<String>,
  pub shipping_address: ShippingAddress,
  pub payment_method: String,
  pub idempotency_key: Option<String>,
  pub items: Vec<OrderItem>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn is_payment_completed(&self) -> bool {
    self.payment_status == Some(PaymentStatus::Completed)
  }
}

/// An order creation request. `total_amount` is what the caller believes the
/// total to be; it must equal the sum of the lines.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: Uuid,
  pub items: Vec<NewOrderItem>,
  pub total_amount: Decimal,
  pub shipping_address: ShippingAddress,
  pub payment_method: String,
  pub idempotency_key: Option<String>,
}

impl NewOrder {
  pub fn computed_total(&self) -> Result<Decimal> {
    money::sum_amounts(self.items.iter().map(NewOrderItem::line_total))
  }

  pub fn validate(&self) -> Result<()> {
    if self.items.is_empty() {
      return Err(AppError::Validation("An order needs at least one item".to_string()));
    }
    for item in &self.items {
      if item.product_id.trim().is_empty() {
        return Err(AppError::Validation("Every line needs a product id".to_string()));
      }
      money::check_quantity(item.quantity)
        .and_then(|_| money::check_amount("Price", item.price))
        .map_err(|e| match e {
          AppError::Validation(m) => AppError::Validation(format!("Product '{}': {}", item.product_id, m)),
          other => other,
        })?;
    }
    let missing = self.shipping_address.missing_fields();
    if !missing.is_empty() {
      return Err(AppError::Validation(format!(
        "Missing shipping fields: {}",
        missing.join(", ")
      )));
    }
    if self.payment_method.trim().is_empty() {
      return Err(AppError::Validation("Payment method is required".to_string()));
    }
    let computed = self.computed_total()?;
    if computed != self.total_amount {
      return Err(AppError::Validation(format!(
        "Declared total {} does not match item total {}",
        self.total_amount, computed
      )));
    }
    Ok(())
  }
}

/// Result of the shared payment confirmation write.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
  Applied(Order),
  AlreadyConfirmed(Order),
}

impl ConfirmOutcome {
  pub fn order(&self) -> &Order {
    match self {
      ConfirmOutcome::Applied(order) | ConfirmOutcome::AlreadyConfirmed(order) => order,
    }
  }

  pub fn into_order(self) -> Order {
    match self {
      ConfirmOutcome::Applied(order) | ConfirmOutcome::AlreadyConfirmed(order) => order,
    }
  }

  pub fn was_applied(&self) -> bool {
    matches!(self, ConfirmOutcome::Applied(_))
  }
}

/// `ORD-<unix millis>-<8 uppercase hex>`. The random tail keeps numbers
/// generated in the same millisecond apart; stores still enforce uniqueness.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
  let tail = Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase();
  format!("ORD-{}-{}", now.timestamp_millis(), tail)
}
