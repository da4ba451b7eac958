use actix_web::{http::StatusCode, test::TestRequest, web::ServiceConfig};
use bank_payment_engine::{
    db_types::{BankTransaction, Order, OrderStatus, TransferType},
    traits::{PaymentGatewayError, SettlementOutcome},
};
use bpg_common::Vnd;
use chrono::{TimeZone, Utc};
use serde_json::json;

use super::helpers::{send_request, wrap_api, TEST_WEBHOOK_SECRET};
use crate::{endpoint_tests::mocks::MockPaymentDb, routes::PaymentWebhookRoute};

fn webhook_body(txid: i64, content: &str, transfer_type: &str, amount: i64) -> serde_json::Value {
    json!({
        "id": txid,
        "gateway": "Vietcombank",
        "transactionDate": "2024-05-25 21:11:02",
        "accountNumber": "0123499999",
        "code": null,
        "content": content,
        "transferType": transfer_type,
        "transferAmount": amount,
        "accumulated": 19_077_000,
        "subAccount": null,
        "referenceCode": "MBVCB.3278907687",
        "description": "payment"
    })
}

fn webhook_request(token: Option<&str>, body: serde_json::Value) -> TestRequest {
    let mut req = TestRequest::post().uri("/payment/receiver").set_json(body);
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    req
}

#[actix_web::test]
async fn webhook_without_token_is_unauthorized() {
    let _ = env_logger::try_init().ok();
    let req = webhook_request(None, webhook_body(1, "DH12", "in", 100_000));
    let (status, body) = send_request(req, configure_settles).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("bearer token"), "unexpected body: {body}");
}

#[actix_web::test]
async fn webhook_with_a_bad_token_is_unauthorized() {
    let _ = env_logger::try_init().ok();
    let req = webhook_request(Some("not-the-secret"), webhook_body(1, "DH12", "in", 100_000));
    let (status, _) = send_request(req, configure_settles).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn matching_transfer_settles_the_payment() {
    let _ = env_logger::try_init().ok();
    let req = webhook_request(Some(TEST_WEBHOOK_SECRET), webhook_body(92704, "chuyen tien DH12", "in", 150_000));
    let (status, body) = send_request(req, configure_settles).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"message":"Payment #12 settled. 1 orders confirmed."}"#);
}

#[actix_web::test]
async fn outbound_transfers_are_recorded_and_ignored() {
    let _ = env_logger::try_init().ok();
    let req = webhook_request(Some(TEST_WEBHOOK_SECRET), webhook_body(92705, "refund", "out", 50_000));
    let (status, body) = send_request(req, configure_outbound).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"message":"Transaction recorded."}"#);
}

#[actix_web::test]
async fn replayed_webhooks_conflict() {
    let _ = env_logger::try_init().ok();
    let req = webhook_request(Some(TEST_WEBHOOK_SECRET), webhook_body(92704, "chuyen tien DH12", "in", 150_000));
    let (status, body) = send_request(req, configure_duplicate).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already been recorded"), "unexpected body: {body}");
}

#[actix_web::test]
async fn transfers_without_a_reference_are_rejected() {
    let _ = env_logger::try_init().ok();
    let req = webhook_request(Some(TEST_WEBHOOK_SECRET), webhook_body(92706, "no reference here", "in", 150_000));
    let (status, body) = send_request(req, configure_settles).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("payment reference"), "unexpected body: {body}");
}

fn configure_settles(cfg: &mut ServiceConfig) {
    let mut db = MockPaymentDb::new();
    db.expect_record_transaction().returning(|txn| Ok(recorded(txn.txid, txn.content, TransferType::In)));
    db.expect_settle_payment().returning(|_, payment_id, amount| {
        Ok(SettlementOutcome { payment_id, user_id: 1, amount, orders: vec![packed_order(payment_id)] })
    });
    cfg.service(PaymentWebhookRoute::<MockPaymentDb>::new()).app_data(wrap_api(db));
}

fn configure_outbound(cfg: &mut ServiceConfig) {
    let mut db = MockPaymentDb::new();
    db.expect_record_transaction().returning(|txn| Ok(recorded(txn.txid, txn.content, TransferType::Out)));
    cfg.service(PaymentWebhookRoute::<MockPaymentDb>::new()).app_data(wrap_api(db));
}

fn configure_duplicate(cfg: &mut ServiceConfig) {
    let mut db = MockPaymentDb::new();
    db.expect_record_transaction().returning(|txn| Err(PaymentGatewayError::DuplicateTransaction(txn.txid)));
    cfg.service(PaymentWebhookRoute::<MockPaymentDb>::new()).app_data(wrap_api(db));
}

fn recorded(txid: i64, content: Option<String>, transfer_type: TransferType) -> BankTransaction {
    BankTransaction {
        id: 1,
        txid,
        gateway: "Vietcombank".to_string(),
        transaction_date: Utc.with_ymd_and_hms(2024, 5, 25, 21, 11, 2).unwrap(),
        account_number: Some("0123499999".to_string()),
        code: None,
        content,
        transfer_type,
        amount: Vnd::from(150_000),
        accumulated: Vnd::from(19_077_000),
        sub_account: None,
        reference_code: Some("MBVCB.3278907687".to_string()),
        description: "payment".to_string(),
        payment_id: None,
        created_at: Utc.with_ymd_and_hms(2024, 5, 25, 21, 11, 3).unwrap(),
    }
}

fn packed_order(payment_id: i64) -> Order {
    Order {
        id: 1,
        payment_id,
        user_id: 1,
        shop_id: 3,
        total: Vnd::from(150_000),
        status: OrderStatus::PendingPackaging,
        created_at: Utc.with_ymd_and_hms(2024, 5, 25, 20, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 25, 21, 11, 2).unwrap(),
        deleted_at: None,
    }
}
