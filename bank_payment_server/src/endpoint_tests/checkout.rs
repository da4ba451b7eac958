use actix_web::{http::StatusCode, test::TestRequest, web::ServiceConfig};
use bank_payment_engine::{
    db_types::{Order, OrderStatus, Payment, PaymentStatus},
    traits::CheckoutResult,
};
use chrono::{TimeZone, Utc};
use serde_json::json;

use super::helpers::{as_user, send_request, wrap_api};
use crate::{
    endpoint_tests::mocks::MockPaymentDb,
    routes::{calculate_order, CreateOrderRoute},
};

fn cart_body() -> serde_json::Value {
    json!({
        "items": [
            { "shopId": 3, "unitPrice": 50_000, "quantity": 3 },
        ]
    })
}

#[actix_web::test]
async fn calculate_is_a_pure_preview() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/orders/calculate").set_json(cart_body()), 1);
    let (status, body) = send_request(req, configure_calculate).await;
    assert_eq!(status, StatusCode::OK);
    let breakdown: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(breakdown["subtotal"], 150_000);
    // Default shipping fee applies below the free-shipping threshold
    assert_eq!(breakdown["grandTotal"], 180_000);
}

#[actix_web::test]
async fn calculate_rejects_an_empty_cart() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/orders/calculate").set_json(json!({"items": []})), 1);
    let (status, _) = send_request(req, configure_calculate).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn checkout_returns_the_payment_to_quote() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/orders").set_json(cart_body()), 1);
    let (status, body) = send_request(req, configure_checkout).await;
    assert_eq!(status, StatusCode::OK);
    let result: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["payment"]["id"], 12);
    assert_eq!(result["orders"][0]["status"], "PendingPayment");
}

#[actix_web::test]
async fn checkout_requires_an_identity() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/orders").set_json(cart_body());
    let (status, _) = send_request(req, configure_checkout).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

fn configure_calculate(cfg: &mut ServiceConfig) {
    cfg.service(calculate_order);
}

fn configure_checkout(cfg: &mut ServiceConfig) {
    let mut db = MockPaymentDb::new();
    db.expect_create_checkout().returning(|checkout, _| {
        let created_at = Utc.with_ymd_and_hms(2024, 5, 25, 20, 0, 0).unwrap();
        let orders = checkout
            .orders
            .iter()
            .enumerate()
            .map(|(i, o)| Order {
                id: i as i64 + 1,
                payment_id: 12,
                user_id: o.user_id,
                shop_id: o.shop_id,
                total: o.total,
                status: OrderStatus::PendingPayment,
                created_at,
                updated_at: created_at,
                deleted_at: None,
            })
            .collect();
        let payment =
            Payment { id: 12, user_id: checkout.user_id, status: PaymentStatus::Unpaid, created_at, updated_at: created_at };
        Ok(CheckoutResult { payment, orders })
    });
    cfg.service(CreateOrderRoute::<MockPaymentDb>::new()).app_data(wrap_api(db));
}
