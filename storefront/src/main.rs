// storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;
use storefront::config::AppConfig;
use storefront::services::paystack::PaystackClient;
use storefront::state::AppState;
use storefront::store::{MemoryStore, PgStore};
use storefront::web;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  if std::env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false) {
    builder.json().init();
  } else {
    builder.init();
  }
}

fn startup_error(stage: &str, err: impl std::fmt::Display) -> std::io::Error {
  tracing::error!(error = %err, "{} failed.", stage);
  std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", stage, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  init_tracing();
  tracing::info!("Starting storefront server...");

  let app_config = Arc::new(AppConfig::from_env().map_err(|e| startup_error("Configuration", e))?);
  let gateway = Arc::new(PaystackClient::from_config(&app_config).map_err(|e| startup_error("Gateway client", e))?);

  let app_state = match app_config.database_url.as_deref() {
    Some(database_url) => {
      let store = PgStore::connect(database_url, app_config.upstream_timeout)
        .await
        .map_err(|e| startup_error("Database connection", e))?;
      store.migrate().await.map_err(|e| startup_error("Database migration", e))?;
      AppState::new(app_config.clone(), Arc::new(store), gateway)
    }
    None => {
      tracing::warn!("DATABASE_URL is not set; using the in-memory store. Data is lost on restart.");
      AppState::new(app_config.clone(), Arc::new(MemoryStore::new()), gateway)
    }
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
