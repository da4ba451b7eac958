use actix_web::{http::StatusCode, test::TestRequest, web::ServiceConfig};
use bank_payment_engine::db_types::{Order, OrderStatus};
use bpg_common::Vnd;
use chrono::{TimeZone, Utc};

use super::helpers::{as_user, send_request, wrap_api};
use crate::{
    auth::USER_ROLES_HEADER,
    endpoint_tests::mocks::MockPaymentDb,
    routes::{CancelOrderRoute, MyOrdersRoute, OrderByIdRoute},
};

#[actix_web::test]
async fn fetch_my_orders_without_identity() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(TestRequest::get().uri("/orders"), configure_listing).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No caller identity"), "unexpected body: {body}");
}

#[actix_web::test]
async fn fetch_my_orders() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/orders"), 1);
    let (status, body) = send_request(req, configure_listing).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ORDERS_JSON);
}

#[actix_web::test]
async fn order_listing_honours_offset_and_count() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/orders?offset=1&count=1"), 1);
    let (status, body) = send_request(req, configure_paged_listing).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"id\":2") && !body.contains("\"id\":1"), "unexpected body: {body}");
}

#[actix_web::test]
async fn listing_another_users_orders_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/orders?user_id=1"), 99);
    let (status, body) = send_request(req, configure_listing).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("not allowed"), "unexpected body: {body}");
}

#[actix_web::test]
async fn operators_may_list_any_users_orders() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/orders?user_id=1"), 99).insert_header((USER_ROLES_HEADER, "operator"));
    let (status, body) = send_request(req, configure_listing).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ORDERS_JSON);
}

#[actix_web::test]
async fn fetch_someone_elses_order_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/orders/1"), 99);
    let (status, body) = send_request(req, configure_detail).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("not allowed"), "unexpected body: {body}");
}

#[actix_web::test]
async fn operators_may_fetch_any_order() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/orders/1"), 99).insert_header((USER_ROLES_HEADER, "operator"));
    let (status, body) = send_request(req, configure_detail).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"id\":1"), "unexpected body: {body}");
}

#[actix_web::test]
async fn owners_can_cancel_their_order() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::put().uri("/orders/1"), 1);
    let (status, body) = send_request(req, configure_cancel).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"status\":\"Cancelled\""), "unexpected body: {body}");
}

#[actix_web::test]
async fn strangers_cannot_cancel_an_order() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::put().uri("/orders/1"), 99);
    let (status, _) = send_request(req, configure_cancel).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn cancelling_a_missing_order_is_not_found() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::put().uri("/orders/42"), 1);
    let (status, _) = send_request(req, configure_missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn configure_listing(cfg: &mut ServiceConfig) {
    let mut db = MockPaymentDb::new();
    // Absent query parameters must reach the backend as the defaults.
    db.expect_fetch_orders_for_user()
        .withf(|user_id, pagination| *user_id == 1 && pagination.offset.is_none() && pagination.count.is_none())
        .returning(|_, _| Ok(orders_response()));
    cfg.service(MyOrdersRoute::<MockPaymentDb>::new()).app_data(wrap_api(db));
}

fn configure_paged_listing(cfg: &mut ServiceConfig) {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_orders_for_user()
        .withf(|user_id, pagination| *user_id == 1 && pagination.offset == Some(1) && pagination.count == Some(1))
        .returning(|_, _| Ok(orders_response().split_off(1)));
    cfg.service(MyOrdersRoute::<MockPaymentDb>::new()).app_data(wrap_api(db));
}

fn configure_detail(cfg: &mut ServiceConfig) {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(orders_response().remove(0))));
    cfg.service(OrderByIdRoute::<MockPaymentDb>::new()).app_data(wrap_api(db));
}

fn configure_cancel(cfg: &mut ServiceConfig) {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(orders_response().remove(0))));
    db.expect_cancel_order().returning(|_| {
        let mut order = orders_response().remove(0);
        order.status = OrderStatus::Cancelled;
        Ok(order)
    });
    cfg.service(CancelOrderRoute::<MockPaymentDb>::new()).app_data(wrap_api(db));
}

fn configure_missing(cfg: &mut ServiceConfig) {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_order().returning(|_| Ok(None));
    cfg.service(CancelOrderRoute::<MockPaymentDb>::new()).app_data(wrap_api(db));
}

// Mock response to `fetch_orders_for_user` and `fetch_order` calls. Both orders belong to user 1.
fn orders_response() -> Vec<Order> {
    vec![
        Order {
            id: 1,
            payment_id: 10,
            user_id: 1,
            shop_id: 3,
            total: Vnd::from(150_000),
            status: OrderStatus::PendingPayment,
            created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
            deleted_at: None,
        },
        Order {
            id: 2,
            payment_id: 11,
            user_id: 1,
            shop_id: 5,
            total: Vnd::from(80_000),
            status: OrderStatus::Delivered,
            created_at: Utc.with_ymd_and_hms(2024, 3, 15, 18, 30, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 16, 11, 20, 0).unwrap(),
            deleted_at: None,
        },
    ]
}

const ORDERS_JSON: &str = r#"[{"id":1,"payment_id":10,"user_id":1,"shop_id":3,"total":150000,"status":"PendingPayment","created_at":"2024-02-29T13:30:00Z","updated_at":"2024-02-29T13:30:00Z","deleted_at":null},{"id":2,"payment_id":11,"user_id":1,"shop_id":5,"total":80000,"status":"Delivered","created_at":"2024-03-15T18:30:00Z","updated_at":"2024-03-16T11:20:00Z","deleted_at":null}]"#;
