// storefront/tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use storefront::config::AppConfig;
use storefront::errors::{AppError, Result};
use storefront::models::{NewCartItem, ShippingAddress};
use storefront::services::paystack::{
  GatewayInit, GatewayTransaction, InitializeTransaction, PaymentGateway, TransactionMetadata,
};
use storefront::services::signature;
use storefront::state::AppState;
use storefront::store::{CartStore, MemoryStore};
use uuid::Uuid;

pub const SECRET: &str = "sk_test_4f1c0ffee";
pub const ADMIN_TOKEN: &str = "admin-test-token";

static TRACING: Lazy<()> = Lazy::new(|| {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
  let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 8080,
    database_url: None,
    app_base_url: "http://shop.test".to_string(),
    paystack_secret_key: Some(SECRET.to_string()),
    paystack_public_key: Some("pk_test_public".to_string()),
    paystack_base_url: "http://paystack.invalid".to_string(),
    payment_currency: "NGN".to_string(),
    upstream_timeout: Duration::from_secs(2),
    admin_api_token: Some(ADMIN_TOKEN.to_string()),
    stale_order_minutes: 60,
  }
}

#[derive(Default)]
struct Script {
  queued_references: VecDeque<String>,
  initialize_failure: Option<(u16, Value)>,
  statuses: HashMap<String, String>,
  amounts: HashMap<String, i64>,
  metadata: HashMap<String, TransactionMetadata>,
  initialize_calls: Vec<InitializeTransaction>,
  verify_calls: Vec<String>,
  delay: Option<Duration>,
}

/// In-process gateway double. Initialized transactions remember their amount
/// and metadata so `verify` reports them back, and default to `success`.
#[derive(Default)]
pub struct ScriptedGateway {
  script: Mutex<Script>,
}

impl ScriptedGateway {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn queue_reference(&self, reference: &str) {
    self.script.lock().queued_references.push_back(reference.to_string());
  }

  pub fn fail_initialize(&self, status: u16, body: Value) {
    self.script.lock().initialize_failure = Some((status, body));
  }

  pub fn set_status(&self, reference: &str, status: &str) {
    self.script.lock().statuses.insert(reference.to_string(), status.to_string());
  }

  pub fn set_amount(&self, reference: &str, amount_minor: i64) {
    self.script.lock().amounts.insert(reference.to_string(), amount_minor);
  }

  pub fn set_delay(&self, delay: Duration) {
    self.script.lock().delay = Some(delay);
  }

  pub fn initialize_calls(&self) -> Vec<InitializeTransaction> {
    self.script.lock().initialize_calls.clone()
  }

  pub fn verify_calls(&self) -> Vec<String> {
    self.script.lock().verify_calls.clone()
  }

  fn delay(&self) -> Option<Duration> {
    self.script.lock().delay
  }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
  async fn initialize(&self, request: &InitializeTransaction) -> Result<GatewayInit> {
    if let Some(delay) = self.delay() {
      tokio::time::sleep(delay).await;
    }
    let mut script = self.script.lock();
    script.initialize_calls.push(request.clone());
    if let Some((status, body)) = script.initialize_failure.clone() {
      return Err(AppError::Gateway { status, body });
    }
    let reference = script
      .queued_references
      .pop_front()
      .unwrap_or_else(|| format!("ref_{}", Uuid::new_v4().simple()));
    script.amounts.entry(reference.clone()).or_insert(request.amount);
    script.metadata.insert(reference.clone(), request.metadata.clone());

    let data = json!({
      "reference": reference,
      "authorization_url": format!("https://checkout.paystack.test/{}", reference),
      "access_code": format!("ac_{}", reference),
    });
    Ok(GatewayInit {
      reference: reference.clone(),
      authorization_url: format!("https://checkout.paystack.test/{}", reference),
      access_code: format!("ac_{}", reference),
      raw: data,
    })
  }

  async fn verify(&self, reference: &str) -> Result<GatewayTransaction> {
    if let Some(delay) = self.delay() {
      tokio::time::sleep(delay).await;
    }
    let mut script = self.script.lock();
    script.verify_calls.push(reference.to_string());
    let status = script.statuses.get(reference).cloned().unwrap_or_else(|| "success".to_string());
    let amount = script.amounts.get(reference).copied().unwrap_or_default();
    let metadata = script.metadata.get(reference).cloned().unwrap_or_default();
    GatewayTransaction::from_data(json!({
      "reference": reference,
      "status": status,
      "amount": amount,
      "currency": "NGN",
      "metadata": metadata,
    }))
  }
}

pub struct Harness {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub gateway: Arc<ScriptedGateway>,
}

pub fn harness() -> Harness {
  harness_with(test_config())
}

pub fn harness_with(config: AppConfig) -> Harness {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let gateway = Arc::new(ScriptedGateway::new());
  let state = AppState::new(Arc::new(config), store.clone(), gateway.clone());
  Harness { state, store, gateway }
}

pub fn shipping() -> ShippingAddress {
  ShippingAddress {
    first_name: "Ada".to_string(),
    last_name: "Obi".to_string(),
    email: "ada@example.com".to_string(),
    phone: "+2348012345678".to_string(),
    address: "12 Marina Road".to_string(),
    city: "Lagos".to_string(),
    zip_code: String::new(),
    country: "NG".to_string(),
  }
}

pub fn cart_line(product_id: &str, quantity: i32, price: Decimal) -> NewCartItem {
  NewCartItem {
    product_id: product_id.to_string(),
    quantity,
    price,
    color: "white".to_string(),
    size: "4L".to_string(),
  }
}

pub async fn fill_cart(store: &MemoryStore, user_id: Uuid, lines: Vec<NewCartItem>) {
  for line in lines {
    store.upsert_item(user_id, line).await.expect("cart upsert");
  }
}

pub fn sign(body: &[u8]) -> String {
  signature::sign(SECRET, body).expect("sign")
}

pub fn charge_success_body(reference: &str, amount_minor: i64, order_id: Uuid, user_id: Uuid) -> Vec<u8> {
  serde_json::to_vec(&json!({
    "event": "charge.success",
    "data": {
      "reference": reference,
      "status": "success",
      "amount": amount_minor,
      "currency": "NGN",
      "metadata": { "order_id": order_id.to_string(), "user_id": user_id.to_string() },
    }
  }))
  .expect("serialize webhook body")
}
