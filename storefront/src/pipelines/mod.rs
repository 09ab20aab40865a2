// storefront/src/pipelines/mod.rs

//! Pipeline definitions and their registration.

use crate::errors::AppError;
use ochre_flow::PipelineRegistry;
use std::sync::Arc;

pub mod contexts;

pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod order_pipeline;
pub mod payment_init_pipeline;
pub mod payment_verify_pipeline;
pub mod webhook_pipeline;

/// Registers every pipeline, keyed by its context type. Called once per `AppState`.
pub fn register_all_pipelines(registry: &Arc<PipelineRegistry<AppError>>) {
  tracing::info!("Registering pipelines...");

  cart_pipeline::register_add_to_cart_pipeline(registry);
  order_pipeline::register_create_order_pipeline(registry);
  payment_init_pipeline::register_payment_init_pipeline(registry);
  payment_verify_pipeline::register_payment_verify_pipeline(registry);
  webhook_pipeline::register_webhook_pipeline(registry);
  checkout_pipeline::register_checkout_pipeline(registry);

  tracing::info!("All application pipelines registered.");
}
