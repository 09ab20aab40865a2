// storefront/src/state.rs

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::pipelines;
use crate::services::paystack::PaymentGateway;
use crate::store::{CartStore, OrderStore, PaymentStore};
use ochre_flow::PipelineRegistry;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub orders: Arc<dyn OrderStore>,
  pub payments: Arc<dyn PaymentStore>,
  pub carts: Arc<dyn CartStore>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub flows: Arc<PipelineRegistry<AppError>>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// Wires one store implementation behind all three store seams and registers every pipeline.
  pub fn new<S>(config: Arc<AppConfig>, store: Arc<S>, gateway: Arc<dyn PaymentGateway>) -> Self
  where
    S: OrderStore + PaymentStore + CartStore + 'static,
  {
    let flows = Arc::new(PipelineRegistry::<AppError>::new());
    pipelines::register_all_pipelines(&flows);
    Self {
      orders: store.clone(),
      payments: store.clone(),
      carts: store,
      gateway,
      flows,
      config,
    }
  }

  /// Runs an upstream call under `UPSTREAM_TIMEOUT_SECS`. Elapsing is an error, never a success.
  pub async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T>
  where
    F: Future<Output = Result<T>>,
  {
    match tokio::time::timeout(self.config.upstream_timeout, call).await {
      Ok(result) => result,
      Err(_) => {
        tracing::warn!(%operation, timeout = ?self.config.upstream_timeout, "Upstream call timed out.");
        Err(AppError::UpstreamTimeout(operation.to_string()))
      }
    }
  }
}
