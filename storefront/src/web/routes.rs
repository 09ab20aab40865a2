// storefront/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{
  admin_handlers, cart_handlers, checkout_handlers, order_handlers, payment_handlers, webhook_handlers,
};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::get_cart_handler))
          .route("", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/{item_id}", web::delete().to(cart_handlers::remove_cart_item_handler)),
      )
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("", web::get().to(order_handlers::list_my_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_my_order_handler)),
      )
      .service(
        web::scope("/checkout")
          .route("", web::post().to(checkout_handlers::start_checkout_handler))
          .route("/callback", web::get().to(checkout_handlers::checkout_callback_handler)),
      )
      .service(
        web::scope("/payments/paystack")
          .route("/initialize", web::post().to(payment_handlers::initialize_payment_handler))
          .route("/verify", web::get().to(payment_handlers::verify_payment_handler))
          .route("/webhooks", web::post().to(webhook_handlers::paystack_webhook_handler)),
      )
      .service(
        web::scope("/admin/orders")
          .route("", web::get().to(admin_handlers::list_orders_handler))
          .route("/stale", web::get().to(admin_handlers::stale_orders_handler))
          .route("/{order_id}/status", web::patch().to(admin_handlers::update_order_status_handler))
          .route("/{order_id}/reconcile", web::post().to(admin_handlers::reconcile_order_handler)),
      ),
  );
}
