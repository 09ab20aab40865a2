// storefront/src/store/memory.rs

use super::{CartStore, OrderFilter, OrderStore, PaymentStore};
use crate::errors::{AppError, Result};
use crate::models::{
  generate_order_number, CartItem, ConfirmOutcome, NewCartItem, NewOrder, NewPaymentRecord, Order, OrderItem,
  OrderStatus, PaymentRecord, PaymentStatus, TransactionStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Full copy of the store contents, for comparing state before and after a call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySnapshot {
  pub orders: Vec<Order>,
  pub payments: Vec<PaymentRecord>,
  pub carts: Vec<CartItem>,
}

#[derive(Default)]
struct Tables {
  orders: Vec<Order>,
  order_numbers: HashSet<String>,
  payments: Vec<PaymentRecord>,
  carts: Vec<CartItem>,
}

/// In-process implementation of every store trait. All tables sit behind one
/// mutex so each operation is atomic, matching the single-statement writes of `PgStore`.
#[derive(Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn snapshot(&self) -> MemorySnapshot {
    let tables = self.tables.lock();
    MemorySnapshot {
      orders: tables.orders.clone(),
      payments: tables.payments.clone(),
      carts: tables.carts.clone(),
    }
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  #[instrument(name = "memory_store::create_order", skip_all, fields(user_id = %new_order.user_id))]
  async fn create_order(&self, new_order: NewOrder) -> Result<Order> {
    new_order.validate()?;
    let mut tables = self.tables.lock();

    if let Some(key) = new_order.idempotency_key.as_deref() {
      let existing = tables
        .orders
        .iter()
        .find(|o| o.user_id == new_order.user_id && o.idempotency_key.as_deref() == Some(key));
      if let Some(order) = existing {
        debug!(order_id = %order.id, "Idempotency key matched an existing order.");
        return Ok(order.clone());
      }
    }

    let now = Utc::now();
    let mut order_number = generate_order_number(now);
    while tables.order_numbers.contains(&order_number) {
      order_number = generate_order_number(now);
    }

    let order_id = Uuid::new_v4();
    let items = new_order
      .items
      .iter()
      .map(|line| OrderItem {
        id: Uuid::new_v4(),
        order_id,
        product_id: line.product_id.clone(),
        quantity: line.quantity,
        price: line.price,
        color: line.color.clone(),
        size: line.size.clone(),
      })
      .collect();

    let order = Order {
      id: order_id,
      order_number: order_number.clone(),
      user_id: new_order.user_id,
      total_amount: new_order.total_amount,
      status: OrderStatus::Pending,
      payment_status: None,
      payment_reference: None,
      shipping_address: new_order.shipping_address,
      payment_method: new_order.payment_method,
      idempotency_key: new_order.idempotency_key,
      items,
      created_at: now,
      updated_at: now,
    };
    tables.order_numbers.insert(order_number);
    tables.orders.push(order.clone());
    Ok(order)
  }

  async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    Ok(self.tables.lock().orders.iter().find(|o| o.id == order_id).cloned())
  }

  async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .orders
        .iter()
        .rev()
        .filter(|o| filter.user_id.map_or(true, |u| o.user_id == u))
        .filter(|o| filter.status.map_or(true, |s| o.status == s))
        .cloned()
        .collect(),
    )
  }

  async fn list_stale_pending(&self, created_before: DateTime<Utc>) -> Result<Vec<Order>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .orders
        .iter()
        .filter(|o| o.status == OrderStatus::Pending && o.created_at < created_before)
        .cloned()
        .collect(),
    )
  }

  async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order> {
    let mut tables = self.tables.lock();
    let order = tables
      .orders
      .iter_mut()
      .find(|o| o.id == order_id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
    order.status = status;
    order.updated_at = Utc::now();
    Ok(order.clone())
  }

  async fn mark_payment_initialized(&self, order_id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    match tables.orders.iter_mut().find(|o| o.id == order_id) {
      Some(order) if order.payment_status.is_none() => {
        order.payment_status = Some(PaymentStatus::Initialized);
        order.updated_at = Utc::now();
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  #[instrument(name = "memory_store::confirm_payment", skip(self))]
  async fn confirm_payment(&self, order_id: Uuid, reference: &str) -> Result<ConfirmOutcome> {
    let mut tables = self.tables.lock();
    let order = tables
      .orders
      .iter_mut()
      .find(|o| o.id == order_id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

    if order.is_payment_completed() {
      return Ok(ConfirmOutcome::AlreadyConfirmed(order.clone()));
    }
    order.payment_status = Some(PaymentStatus::Completed);
    if order.payment_reference.is_none() {
      order.payment_reference = Some(reference.to_string());
    }
    if order.status == OrderStatus::Pending {
      order.status = OrderStatus::Paid;
    }
    order.updated_at = Utc::now();
    Ok(ConfirmOutcome::Applied(order.clone()))
  }
}

#[async_trait]
impl PaymentStore for MemoryStore {
  async fn insert_payment(&self, record: NewPaymentRecord) -> Result<PaymentRecord> {
    let mut tables = self.tables.lock();
    if tables.payments.iter().any(|p| p.reference == record.reference) {
      return Err(AppError::Conflict(format!(
        "Payment reference {} already recorded",
        record.reference
      )));
    }
    let now = Utc::now();
    let stored = PaymentRecord {
      id: Uuid::new_v4(),
      order_id: record.order_id,
      reference: record.reference,
      email: record.email,
      amount: record.amount,
      status: TransactionStatus::Initialized,
      access_code: record.access_code,
      authorization_url: record.authorization_url,
      init_payload: sqlx::types::Json(record.init_payload),
      verify_payload: None,
      created_at: now,
      updated_at: now,
    };
    tables.payments.push(stored.clone());
    Ok(stored)
  }

  async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentRecord>> {
    Ok(self.tables.lock().payments.iter().find(|p| p.reference == reference).cloned())
  }

  async fn list_for_order(&self, order_id: Uuid) -> Result<Vec<PaymentRecord>> {
    Ok(
      self
        .tables
        .lock()
        .payments
        .iter()
        .filter(|p| p.order_id == order_id)
        .cloned()
        .collect(),
    )
  }

  async fn record_verification(
    &self,
    reference: &str,
    status: TransactionStatus,
    payload: serde_json::Value,
  ) -> Result<Option<PaymentRecord>> {
    let mut tables = self.tables.lock();
    let Some(record) = tables.payments.iter_mut().find(|p| p.reference == reference) else {
      return Ok(None);
    };
    if !record.status.is_success() {
      record.status = status;
      record.verify_payload = Some(sqlx::types::Json(payload));
      record.updated_at = Utc::now();
    }
    Ok(Some(record.clone()))
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn cart_items(&self, user_id: Uuid) -> Result<Vec<CartItem>> {
    Ok(
      self
        .tables
        .lock()
        .carts
        .iter()
        .filter(|c| c.user_id == user_id)
        .cloned()
        .collect(),
    )
  }

  async fn upsert_item(&self, user_id: Uuid, item: NewCartItem) -> Result<CartItem> {
    let mut tables = self.tables.lock();
    let existing = tables.carts.iter_mut().find(|c| {
      c.user_id == user_id && c.product_id == item.product_id && c.color == item.color && c.size == item.size
    });
    if let Some(line) = existing {
      line.quantity = item.quantity;
      line.price = item.price;
      return Ok(line.clone());
    }
    let line = CartItem {
      id: Uuid::new_v4(),
      user_id,
      product_id: item.product_id,
      quantity: item.quantity,
      price: item.price,
      color: item.color,
      size: item.size,
      added_at: Utc::now(),
    };
    tables.carts.push(line.clone());
    Ok(line)
  }

  async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
    let mut tables = self.tables.lock();
    let before = tables.carts.len();
    tables.carts.retain(|c| !(c.user_id == user_id && c.id == item_id));
    Ok(tables.carts.len() != before)
  }

  async fn clear_cart(&self, user_id: Uuid) -> Result<u64> {
    let mut tables = self.tables.lock();
    let before = tables.carts.len();
    tables.carts.retain(|c| c.user_id != user_id);
    Ok((before - tables.carts.len()) as u64)
  }
}
