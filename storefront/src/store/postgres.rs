// storefront/src/store/postgres.rs

use super::{CartStore, OrderFilter, OrderStore, PaymentStore};
use crate::errors::{AppError, Result};
use crate::models::{
  generate_order_number, CartItem, ConfirmOutcome, NewCartItem, NewOrder, NewPaymentRecord, Order, OrderItem,
  OrderStatus, PaymentRecord, PaymentStatus, ShippingAddress, TransactionStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, PgExecutor, Postgres, QueryBuilder};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

macro_rules! order_columns {
  () => {
    "id, order_number, user_id, total_amount, status, payment_status, payment_reference, \
     shipping_address, payment_method, idempotency_key, created_at, updated_at"
  };
}

macro_rules! payment_columns {
  () => {
    "id, order_id, paystack_reference, email, amount, status, access_code, authorization_url, \
     init_payload, verify_payload, created_at, updated_at"
  };
}

const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price, color, size";
const CART_COLUMNS: &str = "id, user_id, product_id, quantity, price, color, size, added_at";

#[derive(Debug, FromRow)]
struct OrderRow {
  id: Uuid,
  order_number: String,
  user_id: Uuid,
  total_amount: Decimal,
  status: OrderStatus,
  payment_status: Option<PaymentStatus>,
  payment_reference: Option<String>,
  shipping_address: Json<ShippingAddress>,
  payment_method: String,
  idempotency_key: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl OrderRow {
  fn into_order(self, items: Vec<OrderItem>) -> Order {
    Order {
      id: self.id,
      order_number: self.order_number,
      user_id: self.user_id,
      total_amount: self.total_amount,
      status: self.status,
      payment_status: self.payment_status,
      payment_reference: self.payment_reference,
      shipping_address: self.shipping_address.0,
      payment_method: self.payment_method,
      idempotency_key: self.idempotency_key,
      items,
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }
}

async fn load_items<'e, E>(executor: E, order_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<OrderItem>>>
where
  E: PgExecutor<'e>,
{
  let sql = format!("SELECT {} FROM order_items WHERE order_id = ANY($1)", ITEM_COLUMNS);
  let items: Vec<OrderItem> = sqlx::query_as(&sql)
    .bind(order_ids.to_vec())
    .fetch_all(executor)
    .await?;

  let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
  for item in items {
    grouped.entry(item.order_id).or_default().push(item);
  }
  Ok(grouped)
}

/// Postgres-backed stores. Every payment-related order write is a single
/// conditional statement so concurrent verify and webhook calls cannot interleave.
#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(10)
      .acquire_timeout(acquire_timeout)
      .connect(database_url)
      .await?;
    info!("Connected to Postgres.");
    Ok(Self { pool })
  }

  pub fn from_pool(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn migrate(&self) -> Result<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }

  async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
    if rows.is_empty() {
      return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut items = load_items(&self.pool, &ids).await?;
    Ok(
      rows
        .into_iter()
        .map(|row| {
          let lines = items.remove(&row.id).unwrap_or_default();
          row.into_order(lines)
        })
        .collect(),
    )
  }

  async fn fetch_by_idempotency_key<'e, E>(executor: E, user_id: Uuid, key: &str) -> Result<Option<OrderRow>>
  where
    E: PgExecutor<'e>,
  {
    let row = sqlx::query_as::<_, OrderRow>(concat!(
      "SELECT ",
      order_columns!(),
      " FROM orders WHERE user_id = $1 AND idempotency_key = $2"
    ))
    .bind(user_id)
    .bind(key)
    .fetch_optional(executor)
    .await?;
    Ok(row)
  }
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(name = "pg_store::create_order", skip_all, fields(user_id = %new_order.user_id))]
  async fn create_order(&self, new_order: NewOrder) -> Result<Order> {
    new_order.validate()?;
    let mut tx = self.pool.begin().await?;

    if let Some(key) = new_order.idempotency_key.as_deref() {
      if let Some(row) = Self::fetch_by_idempotency_key(&mut *tx, new_order.user_id, key).await? {
        let mut items = load_items(&mut *tx, &[row.id]).await?;
        tx.commit().await?;
        let lines = items.remove(&row.id).unwrap_or_default();
        return Ok(row.into_order(lines));
      }
    }

    let order_id = Uuid::new_v4();
    let inserted = sqlx::query_as::<_, OrderRow>(concat!(
      "INSERT INTO orders (id, order_number, user_id, total_amount, status, shipping_address, payment_method, idempotency_key) ",
      "VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7) ",
      "ON CONFLICT (user_id, idempotency_key) WHERE idempotency_key IS NOT NULL DO NOTHING ",
      "RETURNING ",
      order_columns!()
    ))
    .bind(order_id)
    .bind(generate_order_number(Utc::now()))
    .bind(new_order.user_id)
    .bind(new_order.total_amount)
    .bind(Json(new_order.shipping_address.clone()))
    .bind(&new_order.payment_method)
    .bind(new_order.idempotency_key.as_deref())
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = inserted else {
      // A concurrent request with the same key committed first.
      tx.rollback().await?;
      let key = new_order.idempotency_key.as_deref().unwrap_or_default();
      let row = Self::fetch_by_idempotency_key(&self.pool, new_order.user_id, key)
        .await?
        .ok_or_else(|| AppError::Internal("Idempotent order vanished after conflict".to_string()))?;
      return self
        .with_items(vec![row])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Idempotent order vanished after conflict".to_string()));
    };

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
      "INSERT INTO order_items (id, order_id, product_id, quantity, price, color, size) ",
    );
    builder.push_values(&new_order.items, |mut b, line| {
      b.push_bind(Uuid::new_v4())
        .push_bind(order_id)
        .push_bind(line.product_id.clone())
        .push_bind(line.quantity)
        .push_bind(line.price)
        .push_bind(line.color.clone())
        .push_bind(line.size.clone());
    });
    builder.push(" RETURNING ");
    builder.push(ITEM_COLUMNS);
    let items: Vec<OrderItem> = builder.build_query_as().fetch_all(&mut *tx).await?;

    tx.commit().await?;
    info!(order_id = %row.id, order_number = %row.order_number, "Order persisted.");
    Ok(row.into_order(items))
  }

  async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(concat!("SELECT ", order_columns!(), " FROM orders WHERE id = $1"))
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await?;
    match row {
      Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
      None => Ok(None),
    }
  }

  async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
    let mut builder: QueryBuilder<Postgres> =
      QueryBuilder::new(concat!("SELECT ", order_columns!(), " FROM orders WHERE TRUE"));
    if let Some(user_id) = filter.user_id {
      builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(status) = filter.status {
      builder.push(" AND status = ").push_bind(status);
    }
    builder.push(" ORDER BY created_at DESC");
    let rows: Vec<OrderRow> = builder.build_query_as().fetch_all(&self.pool).await?;
    self.with_items(rows).await
  }

  async fn list_stale_pending(&self, created_before: DateTime<Utc>) -> Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(concat!(
      "SELECT ",
      order_columns!(),
      " FROM orders WHERE status = 'pending' AND created_at < $1 ORDER BY created_at ASC"
    ))
    .bind(created_before)
    .fetch_all(&self.pool)
    .await?;
    self.with_items(rows).await
  }

  async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order> {
    let row = sqlx::query_as::<_, OrderRow>(concat!(
      "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 RETURNING ",
      order_columns!()
    ))
    .bind(order_id)
    .bind(status)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
    self
      .with_items(vec![row])
      .await?
      .pop()
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))
  }

  async fn mark_payment_initialized(&self, order_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
      "UPDATE orders SET payment_status = 'initialized', updated_at = now() \
       WHERE id = $1 AND payment_status IS NULL",
    )
    .bind(order_id)
    .execute(&self.pool)
    .await?;
    Ok(result.rows_affected() > 0)
  }

  #[instrument(name = "pg_store::confirm_payment", skip(self))]
  async fn confirm_payment(&self, order_id: Uuid, reference: &str) -> Result<ConfirmOutcome> {
    let applied = sqlx::query_as::<_, OrderRow>(concat!(
      "UPDATE orders SET payment_status = 'completed', ",
      "payment_reference = COALESCE(payment_reference, $2), ",
      "status = CASE WHEN status = 'pending' THEN 'paid'::order_status_enum ELSE status END, ",
      "updated_at = now() ",
      "WHERE id = $1 AND payment_status IS DISTINCT FROM 'completed'::payment_status_enum ",
      "RETURNING ",
      order_columns!()
    ))
    .bind(order_id)
    .bind(reference)
    .fetch_optional(&self.pool)
    .await?;

    match applied {
      Some(row) => {
        let order = self
          .with_items(vec![row])
          .await?
          .pop()
          .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
        Ok(ConfirmOutcome::Applied(order))
      }
      None => match self.get_order(order_id).await? {
        Some(order) => Ok(ConfirmOutcome::AlreadyConfirmed(order)),
        None => {
          warn!(%order_id, "Payment confirmation for an unknown order.");
          Err(AppError::NotFound(format!("Order {} not found", order_id)))
        }
      },
    }
  }
}

#[async_trait]
impl PaymentStore for PgStore {
  async fn insert_payment(&self, record: NewPaymentRecord) -> Result<PaymentRecord> {
    let stored = sqlx::query_as::<_, PaymentRecord>(concat!(
      "INSERT INTO payments (id, order_id, paystack_reference, email, amount, status, access_code, authorization_url, init_payload) ",
      "VALUES ($1, $2, $3, $4, $5, 'initialized', $6, $7, $8) RETURNING ",
      payment_columns!()
    ))
    .bind(Uuid::new_v4())
    .bind(record.order_id)
    .bind(&record.reference)
    .bind(&record.email)
    .bind(record.amount)
    .bind(record.access_code.as_deref())
    .bind(record.authorization_url.as_deref())
    .bind(Json(&record.init_payload))
    .fetch_one(&self.pool)
    .await?;
    Ok(stored)
  }

  async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentRecord>> {
    let record = sqlx::query_as::<_, PaymentRecord>(concat!(
      "SELECT ",
      payment_columns!(),
      " FROM payments WHERE paystack_reference = $1"
    ))
    .bind(reference)
    .fetch_optional(&self.pool)
    .await?;
    Ok(record)
  }

  async fn list_for_order(&self, order_id: Uuid) -> Result<Vec<PaymentRecord>> {
    let records = sqlx::query_as::<_, PaymentRecord>(concat!(
      "SELECT ",
      payment_columns!(),
      " FROM payments WHERE order_id = $1 ORDER BY created_at ASC"
    ))
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(records)
  }

  async fn record_verification(
    &self,
    reference: &str,
    status: TransactionStatus,
    payload: serde_json::Value,
  ) -> Result<Option<PaymentRecord>> {
    let updated = sqlx::query_as::<_, PaymentRecord>(concat!(
      "UPDATE payments SET status = $2, verify_payload = $3, updated_at = now() ",
      "WHERE paystack_reference = $1 AND status <> 'success'::transaction_status_enum RETURNING ",
      payment_columns!()
    ))
    .bind(reference)
    .bind(status)
    .bind(Json(payload))
    .fetch_optional(&self.pool)
    .await?;

    match updated {
      Some(record) => Ok(Some(record)),
      None => self.find_by_reference(reference).await,
    }
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn cart_items(&self, user_id: Uuid) -> Result<Vec<CartItem>> {
    let sql = format!("SELECT {} FROM carts WHERE user_id = $1 ORDER BY added_at ASC", CART_COLUMNS);
    let items = sqlx::query_as::<_, CartItem>(&sql)
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(items)
  }

  async fn upsert_item(&self, user_id: Uuid, item: NewCartItem) -> Result<CartItem> {
    let sql = format!(
      "INSERT INTO carts (id, user_id, product_id, quantity, price, color, size) \
       VALUES ($1, $2, $3, $4, $5, $6, $7) \
       ON CONFLICT (user_id, product_id, color, size) \
       DO UPDATE SET quantity = EXCLUDED.quantity, price = EXCLUDED.price \
       RETURNING {}",
      CART_COLUMNS
    );
    let line = sqlx::query_as::<_, CartItem>(&sql)
      .bind(Uuid::new_v4())
      .bind(user_id)
      .bind(&item.product_id)
      .bind(item.quantity)
      .bind(item.price)
      .bind(&item.color)
      .bind(&item.size)
      .fetch_one(&self.pool)
      .await?;
    Ok(line)
  }

  async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM carts WHERE id = $1 AND user_id = $2")
      .bind(item_id)
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn clear_cart(&self, user_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM carts WHERE user_id = $1")
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected())
  }
}
