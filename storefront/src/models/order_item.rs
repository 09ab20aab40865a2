// storefront/src/models/order_item.rs

use crate::errors::Result;
use crate::money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: String,
  pub quantity: i32,
  pub price: Decimal, // unit price at checkout
  pub color: String,
  pub size: String,
}

/// Line item as submitted for order creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderItem {
  #[serde(alias = "productId")]
  pub product_id: String,
  pub quantity: i32,
  pub price: Decimal,
  #[serde(default)]
  pub color: String,
  #[serde(default)]
  pub size: String,
}

impl NewOrderItem {
  pub fn line_total(&self) -> Result<Decimal> {
    money::line_total(self.price, self.quantity)
  }
}
