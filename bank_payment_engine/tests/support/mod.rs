use bank_payment_engine::{
    db_types::{CallerContext, NewBankTransaction, TransferType},
    events::EventProducers,
    helpers::pricing::{CheckoutItem, PricingConfig},
    order_objects::CheckoutRequest,
    OrderFlowApi,
    SqliteDatabase,
};
use bpg_common::Vnd;
use chrono::{Duration, Utc};
use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

pub const REFERENCE_PREFIX: &str = "DH";

/// Creates a fresh, fully migrated SQLite database under a random temp path.
pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    migrate!("./migrations").run(db.pool()).await.expect("Error running DB migrations");
    // Close the migration pool before the test opens its own: a lazily-closing WAL connection can checkpoint
    // mid-test and invalidate the snapshot of an in-flight transaction (SQLITE_BUSY_SNAPSHOT).
    db.pool().close().await;
    debug!("🚀️ Test database ready at {url}");
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/bpg_test_store_{}.db", dir.display(), rand::random::<u64>())
}

/// No free shipping, no shipping fee: keeps order totals equal to their item subtotals so amounts in test
/// scenarios stay easy to follow.
pub fn flat_pricing() -> PricingConfig {
    PricingConfig { shipping_fee: Vnd::from(0), free_shipping_threshold: Vnd::from(0) }
}

pub async fn new_api() -> OrderFlowApi<SqliteDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    // A single connection serialises all test DB access: with a larger pool, a deferred transaction's
    // write upgrade can race another pooled connection's WAL activity and fail with SQLITE_BUSY_SNAPSHOT.
    let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error connecting to test database");
    OrderFlowApi::new(db, EventProducers::default())
}

pub fn item(shop_id: i64, price: i64) -> CheckoutItem {
    CheckoutItem { shop_id, unit_price: Vnd::from(price), quantity: 1 }
}

pub fn cart(items: Vec<CheckoutItem>) -> CheckoutRequest {
    CheckoutRequest { items, discount: None }
}

pub fn caller(user_id: i64) -> CallerContext {
    CallerContext::customer(user_id)
}

/// A bank transfer whose free-text content references the given payment.
pub fn transfer_for(txid: i64, payment_id: i64, amount: i64) -> NewBankTransaction {
    NewBankTransaction {
        txid,
        gateway: "VCB".to_string(),
        transaction_date: Utc::now(),
        account_number: Some("0123456789".to_string()),
        code: None,
        content: Some(format!("chuyen tien {REFERENCE_PREFIX}{payment_id} cam on shop")),
        transfer_type: TransferType::In,
        amount: Vnd::from(amount),
        accumulated: Vnd::from(amount),
        sub_account: None,
        reference_code: Some(format!("FT{txid}")),
        description: "BankAPINotify".to_string(),
    }
}

pub fn day() -> Duration {
    Duration::hours(24)
}
