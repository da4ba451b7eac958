use bank_payment_engine::{
    db_types::{BankTransaction, CancellationJob, NewBankTransaction, Order, Payment},
    traits::{
        CancellationOutcome,
        CheckoutResult,
        NewCheckout,
        Pagination,
        PaymentGatewayDatabase,
        PaymentGatewayError,
        SettlementOutcome,
    },
};
use bpg_common::Vnd;
use chrono::{DateTime, Utc};
use mockall::mock;

mock! {
    pub PaymentDb {}

    impl Clone for PaymentDb {
        fn clone(&self) -> Self;
    }

    impl PaymentGatewayDatabase for PaymentDb {
        fn url(&self) -> &str;
        async fn create_checkout(&self, checkout: NewCheckout, cancel_at: DateTime<Utc>) -> Result<CheckoutResult, PaymentGatewayError>;
        async fn record_transaction(&self, txn: NewBankTransaction) -> Result<BankTransaction, PaymentGatewayError>;
        async fn settle_payment(&self, txid: i64, payment_id: i64, amount: Vnd) -> Result<SettlementOutcome, PaymentGatewayError>;
        async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, PaymentGatewayError>;
        async fn fetch_orders_for_user(&self, user_id: i64, pagination: &Pagination) -> Result<Vec<Order>, PaymentGatewayError>;
        async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, PaymentGatewayError>;
        async fn fetch_orders_for_payment(&self, payment_id: i64) -> Result<Vec<Order>, PaymentGatewayError>;
        async fn cancel_order(&self, order_id: i64) -> Result<Order, PaymentGatewayError>;
        async fn due_cancellation_jobs(&self, now: DateTime<Utc>) -> Result<Vec<CancellationJob>, PaymentGatewayError>;
        async fn expire_unpaid_payment(&self, job: &CancellationJob) -> Result<CancellationOutcome, PaymentGatewayError>;
        async fn remove_cancellation_job(&self, job_id: i64) -> Result<(), PaymentGatewayError>;
    }
}
