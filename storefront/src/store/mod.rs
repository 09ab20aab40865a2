// storefront/src/store/mod.rs

//! Persistence seams. Handlers and pipelines only ever see these traits;
//! `PgStore` backs them with Postgres and `MemoryStore` keeps everything in
//! process for local runs and tests.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::errors::Result;
use crate::models::{
  CartItem, ConfirmOutcome, NewCartItem, NewOrder, NewPaymentRecord, Order, OrderStatus, PaymentRecord,
  TransactionStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
  pub user_id: Option<Uuid>,
  pub status: Option<OrderStatus>,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Persists the order and its items atomically. When `idempotency_key` is
  /// set and an order with the same (user, key) exists, that order is returned.
  async fn create_order(&self, new_order: NewOrder) -> Result<Order>;

  async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>>;

  /// Newest first.
  async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>>;

  /// Pending orders created before `created_before`, oldest first.
  async fn list_stale_pending(&self, created_before: DateTime<Utc>) -> Result<Vec<Order>>;

  /// Fulfillment status edit. Payment fields are untouched.
  async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order>;

  /// Sets `payment_status = initialized` where it is still unset. Returns whether a row changed.
  async fn mark_payment_initialized(&self, order_id: Uuid) -> Result<bool>;

  /// The single confirmation write shared by verify and webhook.
  async fn confirm_payment(&self, order_id: Uuid, reference: &str) -> Result<ConfirmOutcome>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
  async fn insert_payment(&self, record: NewPaymentRecord) -> Result<PaymentRecord>;

  async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentRecord>>;

  async fn list_for_order(&self, order_id: Uuid) -> Result<Vec<PaymentRecord>>;

  /// Stores the latest gateway status and payload. A record already at
  /// `success` is left as is and returned unchanged.
  async fn record_verification(
    &self,
    reference: &str,
    status: TransactionStatus,
    payload: serde_json::Value,
  ) -> Result<Option<PaymentRecord>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  async fn cart_items(&self, user_id: Uuid) -> Result<Vec<CartItem>>;

  async fn upsert_item(&self, user_id: Uuid, item: NewCartItem) -> Result<CartItem>;

  async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool>;

  /// Returns the number of removed lines.
  async fn clear_cart(&self, user_id: Uuid) -> Result<u64>;
}
