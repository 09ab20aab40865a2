// storefront/src/services/paystack.rs

//! Paystack adapter. `PaymentGateway` is the seam pipelines call through;
//! `PaystackClient` talks to the real API over HTTPS.

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::TransactionStatus;
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub order_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
}

impl TransactionMetadata {
  /// Paystack echoes metadata back as an object, a JSON-encoded string, or an
  /// empty string when none was sent.
  pub fn from_value(value: &Value) -> Self {
    match value {
      Value::Object(_) => serde_json::from_value(value.clone()).unwrap_or_default(),
      Value::String(s) if !s.trim().is_empty() => serde_json::from_str(s).unwrap_or_default(),
      _ => Self::default(),
    }
  }

  pub fn order_uuid(&self) -> Option<Uuid> {
    self.order_id.as_deref().and_then(|s| Uuid::parse_str(s).ok())
  }

  pub fn user_uuid(&self) -> Option<Uuid> {
    self.user_id.as_deref().and_then(|s| Uuid::parse_str(s).ok())
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct InitializeTransaction {
  pub email: String,
  /// Minor units.
  pub amount: i64,
  pub currency: String,
  pub callback_url: String,
  pub channels: Vec<String>,
  pub metadata: TransactionMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayInit {
  pub reference: String,
  pub authorization_url: String,
  pub access_code: String,
  pub raw: Value,
}

impl GatewayInit {
  fn from_data(data: Value) -> Result<Self> {
    let field = |name: &str| {
      data
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::Upstream(format!("gateway initialize response is missing '{}'", name)))
    };
    Ok(Self {
      reference: field("reference")?,
      authorization_url: field("authorization_url")?,
      access_code: field("access_code")?,
      raw: data,
    })
  }
}

/// A transaction as the gateway reports it, from either verify or a webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayTransaction {
  pub reference: String,
  pub status: TransactionStatus,
  pub amount_minor: i64,
  pub currency: Option<String>,
  pub metadata: TransactionMetadata,
  pub raw: Value,
}

impl GatewayTransaction {
  pub fn from_data(data: Value) -> Result<Self> {
    let reference = data
      .get("reference")
      .and_then(Value::as_str)
      .filter(|r| !r.trim().is_empty())
      .map(str::to_string)
      .ok_or_else(|| AppError::Validation("transaction data has no reference".to_string()))?;
    let status = data
      .get("status")
      .and_then(Value::as_str)
      .map(TransactionStatus::from_gateway)
      .unwrap_or(TransactionStatus::Unknown);
    let amount_minor = data.get("amount").and_then(Value::as_i64).unwrap_or_default();
    let currency = data.get("currency").and_then(Value::as_str).map(str::to_string);
    let metadata = data.get("metadata").map(TransactionMetadata::from_value).unwrap_or_default();
    Ok(Self {
      reference,
      status,
      amount_minor,
      currency,
      metadata,
      raw: data,
    })
  }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn initialize(&self, request: &InitializeTransaction) -> Result<GatewayInit>;
  async fn verify(&self, reference: &str) -> Result<GatewayTransaction>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
  status: bool,
  #[serde(default)]
  message: String,
  #[serde(default)]
  data: Value,
}

#[derive(Clone)]
pub struct PaystackClient {
  http: reqwest::Client,
  base_url: String,
  secret_key: Option<String>,
}

impl PaystackClient {
  pub fn new(base_url: impl Into<String>, secret_key: Option<String>, timeout: Duration) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Could not build HTTP client: {}", e)))?;
    Ok(Self {
      http,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      secret_key,
    })
  }

  pub fn from_config(config: &AppConfig) -> Result<Self> {
    Self::new(
      config.paystack_base_url.clone(),
      config.paystack_secret_key.clone(),
      config.upstream_timeout,
    )
  }

  fn secret(&self) -> Result<&str> {
    self
      .secret_key
      .as_deref()
      .ok_or_else(|| AppError::Config("PAYSTACK_SECRET_KEY is not configured".to_string()))
  }

  /// Sends the request and unwraps Paystack's `{status, message, data}` envelope.
  async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Value> {
    let response = request.bearer_auth(self.secret()?).send().await?;
    let status = response.status();
    let text = response.text().await?;
    let body: Value = serde_json::from_str(&text).map_err(|_| {
      warn!(%operation, http_status = status.as_u16(), "Gateway returned a non-JSON body.");
      AppError::Upstream(format!("{}: gateway returned a non-JSON body (HTTP {})", operation, status))
    })?;

    let envelope: Option<Envelope> = serde_json::from_value(body.clone()).ok();
    match envelope {
      Some(env) if status.is_success() && env.status => {
        debug!(%operation, message = %env.message, "Gateway call succeeded.");
        Ok(env.data)
      }
      _ => {
        let http_status = if status.is_success() { StatusCode::BAD_GATEWAY } else { status };
        warn!(%operation, http_status = status.as_u16(), "Gateway rejected the request.");
        Err(AppError::Gateway {
          status: http_status.as_u16(),
          body,
        })
      }
    }
  }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
  #[instrument(name = "paystack::initialize", skip_all, fields(amount = request.amount, currency = %request.currency))]
  async fn initialize(&self, request: &InitializeTransaction) -> Result<GatewayInit> {
    let url = format!("{}/transaction/initialize", self.base_url);
    let data = self.send(self.http.post(url).json(request), "initialize").await?;
    GatewayInit::from_data(data)
  }

  #[instrument(name = "paystack::verify", skip(self))]
  async fn verify(&self, reference: &str) -> Result<GatewayTransaction> {
    let url = format!("{}/transaction/verify/{}", self.base_url, reference);
    let data = self.send(self.http.get(url), "verify").await?;
    GatewayTransaction::from_data(data)
  }
}
