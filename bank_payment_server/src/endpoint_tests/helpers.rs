use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use bank_payment_engine::events::EventProducers;
use bank_payment_engine::OrderFlowApi;

use crate::{auth::USER_ID_HEADER, config::ServerConfig, endpoint_tests::mocks::MockPaymentDb};

pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";

/// A test configuration with a known webhook secret and the default pricing rules.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.webhook_secret = bpg_common::Secret::new(TEST_WEBHOOK_SECRET.to_string());
    config
}

pub fn wrap_api(db: MockPaymentDb) -> web::Data<OrderFlowApi<MockPaymentDb>> {
    web::Data::new(OrderFlowApi::new(db, EventProducers::default()))
}

pub async fn send_request(req: TestRequest, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = App::new().app_data(web::Data::new(test_config())).configure(configure);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

pub fn as_user(req: TestRequest, user_id: i64) -> TestRequest {
    req.insert_header((USER_ID_HEADER, user_id.to_string()))
}
