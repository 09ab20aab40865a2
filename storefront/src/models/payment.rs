// storefront/src/models/payment.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

/// Status of a transaction as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "transaction_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
  Initialized,
  Success,
  Failed,
  Abandoned,
  Reversed,
  Pending,
  Unknown,
}

impl TransactionStatus {
  pub fn from_gateway(raw: &str) -> Self {
    match raw.trim().to_ascii_lowercase().as_str() {
      "initialized" => TransactionStatus::Initialized,
      "success" => TransactionStatus::Success,
      "failed" => TransactionStatus::Failed,
      "abandoned" => TransactionStatus::Abandoned,
      "reversed" => TransactionStatus::Reversed,
      "ongoing" | "processing" | "queued" | "pending" => TransactionStatus::Pending,
      _ => TransactionStatus::Unknown,
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, TransactionStatus::Success)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PaymentRecord {
  pub id: Uuid,
  pub order_id: Uuid,
  #[sqlx(rename = "paystack_reference")]
  pub reference: String,
  pub email: String,
  pub amount: Decimal,
  pub status: TransactionStatus,
  pub access_code: Option<String>,
  pub authorization_url: Option<String>,
  pub init_payload: sqlx::types::Json<serde_json::Value>,
  pub verify_payload: Option<sqlx::types::Json<serde_json::Value>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentRecord {
  pub order_id: Uuid,
  pub reference: String,
  pub email: String,
  pub amount: Decimal,
  pub access_code: Option<String>,
  pub authorization_url: Option<String>,
  pub init_payload: serde_json::Value,
}
