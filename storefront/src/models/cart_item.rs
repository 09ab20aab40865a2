// storefront/src/models/cart_item.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::order_item::NewOrderItem;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CartItem {
  pub id: Uuid,
  pub user_id: Uuid,
  pub product_id: String,
  pub quantity: i32,
  pub price: Decimal,
  pub color: String,
  pub size: String,
  pub added_at: DateTime<Utc>,
}

impl CartItem {
  /// The cart line as it is frozen into an order.
  pub fn to_order_item(&self) -> NewOrderItem {
    NewOrderItem {
      product_id: self.product_id.clone(),
      quantity: self.quantity,
      price: self.price,
      color: self.color.clone(),
      size: self.size.clone(),
    }
  }
}

/// Upserted per (user, product, color, size); a second add replaces quantity and price.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
  #[serde(alias = "product_id")]
  pub product_id: String,
  pub quantity: i32,
  pub price: Decimal,
  #[serde(default)]
  pub color: String,
  #[serde(default)]
  pub size: String,
}
