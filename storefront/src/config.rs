// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

pub const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// When absent the server runs on the in-memory store.
  pub database_url: Option<String>,
  pub app_base_url: String,

  // Gateway
  pub paystack_secret_key: Option<String>,
  pub paystack_public_key: Option<String>,
  pub paystack_base_url: String,
  pub payment_currency: String,

  /// Applied to every store and gateway call made while serving a request.
  pub upstream_timeout: Duration,

  pub admin_api_token: Option<String>,
  pub stale_order_minutes: i64,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let optional_env = |var_name: &str| get_env(var_name).ok().filter(|v| !v.trim().is_empty());

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = optional_env("DATABASE_URL");
    let app_base_url = get_env("APP_BASE_URL")
      .unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port))
      .trim_end_matches('/')
      .to_string();

    let paystack_secret_key = optional_env("PAYSTACK_SECRET_KEY");
    let paystack_public_key = optional_env("PAYSTACK_PUBLIC_KEY");
    let paystack_base_url = get_env("PAYSTACK_BASE_URL")
      .unwrap_or_else(|_| DEFAULT_PAYSTACK_BASE_URL.to_string())
      .trim_end_matches('/')
      .to_string();
    let payment_currency = get_env("PAYMENT_CURRENCY").unwrap_or_else(|_| "NGN".to_string());

    let upstream_timeout_secs = get_env("UPSTREAM_TIMEOUT_SECS")
      .unwrap_or_else(|_| "10".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid UPSTREAM_TIMEOUT_SECS: {}", e)))?;
    if upstream_timeout_secs == 0 {
      return Err(AppError::Config("UPSTREAM_TIMEOUT_SECS must be greater than zero".to_string()));
    }

    let admin_api_token = optional_env("ADMIN_API_TOKEN");
    let stale_order_minutes = get_env("STALE_ORDER_MINUTES")
      .unwrap_or_else(|_| "60".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid STALE_ORDER_MINUTES: {}", e)))?;

    if paystack_secret_key.is_none() {
      tracing::warn!("PAYSTACK_SECRET_KEY is not set; payment endpoints will answer with a configuration error.");
    }
    tracing::info!(
      server_host = %server_host,
      server_port,
      database = database_url.is_some(),
      paystack_base_url = %paystack_base_url,
      "Application configuration loaded."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      paystack_secret_key,
      paystack_public_key,
      paystack_base_url,
      payment_currency,
      upstream_timeout: Duration::from_secs(upstream_timeout_secs),
      admin_api_token,
      stale_order_minutes,
    })
  }

  /// Where the gateway sends the customer after the hosted payment page.
  pub fn payment_callback_url(&self) -> String {
    format!("{}/api/v1/checkout/callback", self.app_base_url)
  }

  pub fn require_paystack_secret(&self) -> Result<&str> {
    self
      .paystack_secret_key
      .as_deref()
      .ok_or_else(|| AppError::Config("PAYSTACK_SECRET_KEY is not configured".to_string()))
  }
}
