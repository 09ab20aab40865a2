// storefront/tests/http_api_tests.rs
mod common;

use actix_web::{http::StatusCode, test, web, App};
use common::*;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use storefront::models::{OrderStatus, PaymentStatus};
use storefront::services::checkout::{CheckoutSession, GatewayHandoff};
use storefront::state::AppState;
use storefront::store::{CartStore, OrderStore};
use storefront::web::configure_app_routes;
use uuid::Uuid;

const WEBHOOK_PATH: &str = "/api/v1/payments/paystack/webhooks";

macro_rules! app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($state.clone()))
        .configure(configure_app_routes),
    )
    .await
  };
}

async fn checkout_for(state: &AppState, user_id: Uuid) -> GatewayHandoff {
  let mut session = CheckoutSession::new(user_id);
  session.submit_shipping(shipping()).unwrap();
  session.confirm_payment_method("paystack").unwrap();
  session.pay(state).await.unwrap()
}

fn shipping_json() -> Value {
  json!({
    "firstName": "Ada",
    "lastName": "Obi",
    "email": "ada@example.com",
    "phone": "+2348012345678",
    "address": "12 Marina Road",
    "city": "Lagos",
    "country": "NG"
  })
}

#[actix_web::test]
async fn health_reports_ok() {
  let h = harness();
  let app = app!(h.state);

  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/health").to_request()).await;

  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn signed_charge_success_marks_order_paid() {
  let h = harness();
  let user_id = Uuid::new_v4();
  fill_cart(&h.store, user_id, vec![cart_line("p1", 2, dec!(1000))]).await;
  h.gateway.queue_reference("ref_hook");
  let handoff = checkout_for(&h.state, user_id).await;
  let app = app!(h.state);

  let body = charge_success_body("ref_hook", 200_000, handoff.order.id, user_id);
  let req = test::TestRequest::post()
    .uri(WEBHOOK_PATH)
    .insert_header(("x-paystack-signature", sign(&body)))
    .insert_header(("content-type", "application/json"))
    .set_payload(body)
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::OK);
  let reply: Value = test::read_body_json(resp).await;
  assert_eq!(reply, json!({ "received": true }));

  let order = h.state.orders.get_order(handoff.order.id).await.unwrap().unwrap();
  assert_eq!(order.status, OrderStatus::Paid);
  assert_eq!(order.payment_status, Some(PaymentStatus::Completed));
  assert_eq!(order.payment_reference.as_deref(), Some("ref_hook"));
  assert!(h.state.carts.cart_items(user_id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn tampered_or_unsigned_webhook_is_rejected_without_side_effects() {
  let h = harness();
  let user_id = Uuid::new_v4();
  fill_cart(&h.store, user_id, vec![cart_line("p1", 1, dec!(1000))]).await;
  h.gateway.queue_reference("ref_tamper");
  let handoff = checkout_for(&h.state, user_id).await;
  let before = h.store.snapshot();
  let app = app!(h.state);

  let genuine = charge_success_body("ref_tamper", 100_000, handoff.order.id, user_id);
  let signature = sign(&genuine);
  let forged = charge_success_body("ref_tamper", 1, handoff.order.id, user_id);

  let tampered = test::TestRequest::post()
    .uri(WEBHOOK_PATH)
    .insert_header(("x-paystack-signature", signature))
    .set_payload(forged.clone())
    .to_request();
  let resp = test::call_service(&app, tampered).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let reply: Value = test::read_body_json(resp).await;
  assert_eq!(reply["error"], "Invalid signature");

  let unsigned = test::TestRequest::post().uri(WEBHOOK_PATH).set_payload(forged).to_request();
  let resp = test::call_service(&app, unsigned).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let garbage = test::TestRequest::post()
    .uri(WEBHOOK_PATH)
    .insert_header(("x-paystack-signature", "not-hex"))
    .set_payload(genuine)
    .to_request();
  let resp = test::call_service(&app, garbage).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  assert_eq!(h.store.snapshot(), before);
}

#[actix_web::test]
async fn unhandled_event_is_acknowledged_and_ignored() {
  let h = harness();
  let before = h.store.snapshot();
  let app = app!(h.state);

  let body = serde_json::to_vec(&json!({ "event": "transfer.success", "data": { "reference": "trf_1" } })).unwrap();
  let req = test::TestRequest::post()
    .uri(WEBHOOK_PATH)
    .insert_header(("x-paystack-signature", sign(&body)))
    .set_payload(body)
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(h.store.snapshot(), before);
}

#[actix_web::test]
async fn charge_for_unknown_reference_is_acknowledged() {
  let h = harness();
  let before = h.store.snapshot();
  let app = app!(h.state);

  let body = charge_success_body("ref_nobody", 5_000, Uuid::new_v4(), Uuid::new_v4());
  let req = test::TestRequest::post()
    .uri(WEBHOOK_PATH)
    .insert_header(("x-paystack-signature", sign(&body)))
    .set_payload(body)
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(h.store.snapshot(), before);
}

#[actix_web::test]
async fn signed_but_malformed_webhook_is_a_bad_request() {
  let h = harness();
  let app = app!(h.state);

  for body in [b"{not json".to_vec(), b"{\"data\":{}}".to_vec()] {
    let req = test::TestRequest::post()
      .uri(WEBHOOK_PATH)
      .insert_header(("x-paystack-signature", sign(&body)))
      .set_payload(body)
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }
}

#[actix_web::test]
async fn cart_checkout_and_callback_complete_the_purchase() {
  let h = harness();
  let user_id = Uuid::new_v4();
  h.gateway.queue_reference("ref_http");
  let app = app!(h.state);

  let add = test::TestRequest::post()
    .uri("/api/v1/cart")
    .insert_header(("X-User-ID", user_id.to_string()))
    .set_json(json!({ "productId": "p1", "quantity": 2, "price": "1000", "color": "white", "size": "4L" }))
    .to_request();
  let resp = test::call_service(&app, add).await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let start = test::TestRequest::post()
    .uri("/api/v1/checkout")
    .insert_header(("X-User-ID", user_id.to_string()))
    .set_json(json!({ "shippingAddress": shipping_json(), "paymentMethod": "paystack" }))
    .to_request();
  let resp = test::call_service(&app, start).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let started: Value = test::read_body_json(resp).await;
  assert_eq!(started["reference"], "ref_http");
  assert_eq!(started["authorizationUrl"], "https://checkout.paystack.test/ref_http");
  assert_eq!(started["publicKey"], "pk_test_public");
  assert!(started["checkoutToken"].as_str().is_some_and(|t| !t.is_empty()));
  assert_eq!(h.gateway.initialize_calls()[0].amount, 200_000);

  let callback = test::TestRequest::get()
    .uri("/api/v1/checkout/callback?trxref=ref_http&reference=ref_http")
    .to_request();
  let resp = test::call_service(&app, callback).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let done: Value = test::read_body_json(resp).await;
  assert_eq!(done["status"], "succeeded");
  assert_eq!(done["transaction_status"], "success");
  assert_eq!(done["cart_cleared"], true);

  let cart = test::TestRequest::get()
    .uri("/api/v1/cart")
    .insert_header(("X-User-ID", user_id.to_string()))
    .to_request();
  let cart: Value = test::call_and_read_body_json(&app, cart).await;
  assert_eq!(cart["items"], json!([]));
}

#[actix_web::test]
async fn checkout_with_missing_shipping_fields_is_rejected() {
  let h = harness();
  let user_id = Uuid::new_v4();
  fill_cart(&h.store, user_id, vec![cart_line("p1", 1, dec!(1000))]).await;
  let app = app!(h.state);

  let mut address = shipping_json();
  address["city"] = json!("");
  let req = test::TestRequest::post()
    .uri("/api/v1/checkout")
    .insert_header(("X-User-ID", user_id.to_string()))
    .set_json(json!({ "shippingAddress": address, "paymentMethod": "paystack" }))
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["error"].as_str().is_some_and(|e| e.contains("city")));
  assert!(h.store.snapshot().orders.is_empty());
}

#[actix_web::test]
async fn requests_without_user_header_are_unauthorized() {
  let h = harness();
  let app = app!(h.state);

  for uri in ["/api/v1/cart", "/api/v1/orders"] {
    let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
  }
  let resp = test::call_service(
    &app,
    test::TestRequest::get()
      .uri("/api/v1/cart")
      .insert_header(("X-User-ID", "not-a-uuid"))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn initialize_validates_email_and_order() {
  let h = harness();
  let user_id = Uuid::new_v4();
  let app = app!(h.state);

  let missing_email = test::TestRequest::post()
    .uri("/api/v1/payments/paystack/initialize")
    .insert_header(("X-User-ID", user_id.to_string()))
    .set_json(json!({ "email": "", "amount": "2000", "orderId": Uuid::new_v4() }))
    .to_request();
  let resp = test::call_service(&app, missing_email).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let unknown_order = test::TestRequest::post()
    .uri("/api/v1/payments/paystack/initialize")
    .insert_header(("X-User-ID", user_id.to_string()))
    .set_json(json!({ "email": "ada@example.com", "amount": "2000", "orderId": Uuid::new_v4() }))
    .to_request();
  let resp = test::call_service(&app, unknown_order).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert!(h.gateway.initialize_calls().is_empty());
}

#[actix_web::test]
async fn initialize_for_a_paid_order_conflicts() {
  let h = harness();
  let user_id = Uuid::new_v4();
  fill_cart(&h.store, user_id, vec![cart_line("p1", 2, dec!(1000))]).await;
  h.gateway.queue_reference("ref_paid");
  let handoff = checkout_for(&h.state, user_id).await;
  h.state.orders.confirm_payment(handoff.order.id, "ref_paid").await.unwrap();
  let app = app!(h.state);

  let req = test::TestRequest::post()
    .uri("/api/v1/payments/paystack/initialize")
    .insert_header(("X-User-ID", user_id.to_string()))
    .set_json(json!({ "email": "ada@example.com", "amount": "2000", "orderId": handoff.order.id }))
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::CONFLICT);
  assert_eq!(h.gateway.initialize_calls().len(), 1);
}

#[actix_web::test]
async fn payment_endpoints_need_the_gateway_secret() {
  let mut config = test_config();
  config.paystack_secret_key = None;
  let h = harness_with(config);
  let app = app!(h.state);

  let init = test::TestRequest::post()
    .uri("/api/v1/payments/paystack/initialize")
    .insert_header(("X-User-ID", Uuid::new_v4().to_string()))
    .set_json(json!({ "email": "ada@example.com", "amount": "2000", "orderId": Uuid::new_v4() }))
    .to_request();
  let resp = test::call_service(&app, init).await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Configuration issue");

  let body = b"{\"event\":\"charge.success\"}".to_vec();
  let hook = test::TestRequest::post()
    .uri(WEBHOOK_PATH)
    .insert_header(("x-paystack-signature", sign(&body)))
    .set_payload(body)
    .to_request();
  let resp = test::call_service(&app, hook).await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn verify_endpoint_reports_gateway_result_for_unknown_reference() {
  let h = harness();
  h.gateway.set_amount("ref_elsewhere", 12_345);
  let app = app!(h.state);

  let req = test::TestRequest::get()
    .uri("/api/v1/payments/paystack/verify?reference=ref_elsewhere")
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;

  assert_eq!(body["status"], "success");
  assert_eq!(body["amount"], "123.45");
  assert_eq!(body["record_found"], false);
  assert_eq!(body["confirmed"], false);
  assert!(h.store.snapshot().orders.is_empty());
}

#[actix_web::test]
async fn admin_routes_require_the_admin_token() {
  let h = harness();
  let user_id = Uuid::new_v4();
  fill_cart(&h.store, user_id, vec![cart_line("p1", 1, dec!(1000))]).await;
  h.gateway.fail_initialize(500, json!({ "status": false, "message": "Gateway down" }));
  let mut session = CheckoutSession::new(user_id);
  session.submit_shipping(shipping()).unwrap();
  session.confirm_payment_method("paystack").unwrap();
  assert!(session.pay(&h.state).await.is_err());
  let app = app!(h.state);

  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/admin/orders").to_request()).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let wrong = test::TestRequest::get()
    .uri("/api/v1/admin/orders")
    .insert_header(("X-Admin-Token", "guess"))
    .to_request();
  assert_eq!(test::call_service(&app, wrong).await.status(), StatusCode::UNAUTHORIZED);

  let listed = test::TestRequest::get()
    .uri("/api/v1/admin/orders?status=pending")
    .insert_header(("X-Admin-Token", ADMIN_TOKEN))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, listed).await;
  let orders = body["orders"].as_array().unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0]["status"], "pending");
  assert_eq!(orders[0]["payment_status"], Value::Null);

  let stale = test::TestRequest::get()
    .uri("/api/v1/admin/orders/stale?olderThanMinutes=0")
    .insert_header(("X-Admin-Token", ADMIN_TOKEN))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, stale).await;
  assert_eq!(body["orders"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn admin_status_update_validates_the_status() {
  let h = harness();
  let user_id = Uuid::new_v4();
  fill_cart(&h.store, user_id, vec![cart_line("p1", 1, dec!(1000))]).await;
  let handoff = checkout_for(&h.state, user_id).await;
  let app = app!(h.state);

  let bad = test::TestRequest::patch()
    .uri(&format!("/api/v1/admin/orders/{}/status", handoff.order.id))
    .insert_header(("X-Admin-Token", ADMIN_TOKEN))
    .set_json(json!({ "status": "teleported" }))
    .to_request();
  assert_eq!(test::call_service(&app, bad).await.status(), StatusCode::BAD_REQUEST);

  let good = test::TestRequest::patch()
    .uri(&format!("/api/v1/admin/orders/{}/status", handoff.order.id))
    .insert_header(("X-Admin-Token", ADMIN_TOKEN))
    .set_json(json!({ "status": "processing" }))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, good).await;
  assert_eq!(body["order"]["status"], "processing");
  assert_eq!(body["order"]["payment_status"], "initialized");
}

#[actix_web::test]
async fn oversized_or_sub_cent_prices_are_bad_requests() {
  let h = harness();
  let user_id = Uuid::new_v4();
  let app = app!(h.state);

  for price in ["79228162514264337593543950335", "10.005"] {
    let add = test::TestRequest::post()
      .uri("/api/v1/cart")
      .insert_header(("X-User-ID", user_id.to_string()))
      .set_json(json!({ "productId": "p1", "quantity": 2, "price": price }))
      .to_request();
    assert_eq!(test::call_service(&app, add).await.status(), StatusCode::BAD_REQUEST, "{}", price);

    let order = test::TestRequest::post()
      .uri("/api/v1/orders")
      .insert_header(("X-User-ID", user_id.to_string()))
      .set_json(json!({
        "cartItems": [{ "product_id": "p1", "quantity": 2, "price": price, "color": "white", "size": "4L" }],
        "totalAmount": "1",
        "shippingAddress": shipping_json(),
        "paymentMethod": "paystack"
      }))
      .to_request();
    assert_eq!(test::call_service(&app, order).await.status(), StatusCode::BAD_REQUEST, "{}", price);
  }

  let cart = test::TestRequest::get()
    .uri("/api/v1/cart")
    .insert_header(("X-User-ID", user_id.to_string()))
    .to_request();
  let resp = test::call_service(&app, cart).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(h.store.snapshot().orders.is_empty());
}

#[actix_web::test]
async fn initialize_rejects_sub_cent_amounts() {
  let h = harness();
  let user_id = Uuid::new_v4();
  fill_cart(&h.store, user_id, vec![cart_line("p1", 1, dec!(10))]).await;
  let handoff = checkout_for(&h.state, user_id).await;
  let app = app!(h.state);

  let req = test::TestRequest::post()
    .uri("/api/v1/payments/paystack/initialize")
    .insert_header(("X-User-ID", user_id.to_string()))
    .set_json(json!({ "email": "ada@example.com", "amount": "10.005", "orderId": handoff.order.id }))
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(h.gateway.initialize_calls().len(), 1);
}

#[actix_web::test]
async fn charge_success_without_reference_is_acknowledged() {
  let h = harness();
  let user_id = Uuid::new_v4();
  fill_cart(&h.store, user_id, vec![cart_line("p1", 1, dec!(1000))]).await;
  let handoff = checkout_for(&h.state, user_id).await;
  let before = h.store.snapshot();
  let app = app!(h.state);

  let body = serde_json::to_vec(&json!({
    "event": "charge.success",
    "data": {
      "status": "success",
      "amount": 100_000,
      "metadata": { "order_id": handoff.order.id.to_string(), "user_id": user_id.to_string() }
    }
  }))
  .unwrap();
  let req = test::TestRequest::post()
    .uri(WEBHOOK_PATH)
    .insert_header(("x-paystack-signature", sign(&body)))
    .set_payload(body)
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), StatusCode::OK);
  let reply: Value = test::read_body_json(resp).await;
  assert_eq!(reply, json!({ "received": true }));
  assert_eq!(h.store.snapshot(), before);
}
