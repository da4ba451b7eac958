use bpg_common::Vnd;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{BankTransaction, CancellationJob, NewBankTransaction, Order, OrderStatus, Payment},
    helpers::pricing::PricingError,
    traits::data_objects::{CancellationOutcome, CheckoutResult, NewCheckout, Pagination, SettlementOutcome},
};

/// The storage contract for the payment reconciliation engine.
///
/// Implementations must provide real transactional semantics: every mutating method is a single atomic unit, and the
/// Payment + covered Orders tuple is only ever guarded by the database transaction, never by in-process locks,
/// because several server instances run against the same database concurrently.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Inserts the payment, its orders, and the delayed cancellation job in one transaction. The job is keyed by the
    /// payment id ([`crate::db_types::cancellation_job_key`]), so a retried checkout replaces the job rather than
    /// duplicating it.
    async fn create_checkout(
        &self,
        checkout: NewCheckout,
        cancel_at: DateTime<Utc>,
    ) -> Result<CheckoutResult, PaymentGatewayError>;

    /// Appends the inbound webhook payload to the immutable audit log. Fails fast with
    /// [`PaymentGatewayError::DuplicateTransaction`] if the bank transaction id was recorded before. The insert
    /// commits on its own so the audit row survives a subsequently rejected settlement.
    async fn record_transaction(&self, txn: NewBankTransaction) -> Result<BankTransaction, PaymentGatewayError>;

    /// Settles the payment against the recorded bank transaction `txid`, in one transaction:
    /// loads the payment and its covered orders, verifies `amount` equals the exact sum of the orders still awaiting
    /// payment, then marks the payment `Settled`, moves those orders to `PendingPackaging` through the state
    /// machine, and links the audit row to the payment. Any failure rolls the whole transaction back.
    async fn settle_payment(
        &self,
        txid: i64,
        payment_id: i64,
        amount: Vnd,
    ) -> Result<SettlementOutcome, PaymentGatewayError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, PaymentGatewayError>;

    /// The caller's orders, newest first, soft-deleted rows excluded.
    async fn fetch_orders_for_user(
        &self,
        user_id: i64,
        pagination: &Pagination,
    ) -> Result<Vec<Order>, PaymentGatewayError>;

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, PaymentGatewayError>;

    async fn fetch_orders_for_payment(&self, payment_id: i64) -> Result<Vec<Order>, PaymentGatewayError>;

    /// Cancels a single order, checking the transition against the state machine inside the transaction.
    async fn cancel_order(&self, order_id: i64) -> Result<Order, PaymentGatewayError>;

    /// Cancellation jobs whose `run_at` has passed.
    async fn due_cancellation_jobs(&self, now: DateTime<Utc>) -> Result<Vec<CancellationJob>, PaymentGatewayError>;

    /// Fires one cancellation job. In a single transaction: claims (deletes) the job row, re-reads the payment, and
    /// if it is still unpaid cancels every covered order still awaiting payment and marks the payment `Failed`.
    /// If the payment was settled in the meantime, or another worker claimed the job first, this is a no-op.
    /// Safe to call more than once for the same payment.
    async fn expire_unpaid_payment(&self, job: &CancellationJob) -> Result<CancellationOutcome, PaymentGatewayError>;

    /// Removes a job without running it. Used to drop jobs whose handler failed, per the no-internal-retry policy.
    async fn remove_cancellation_job(&self, job_id: i64) -> Result<(), PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Bank transaction {0} has already been recorded")]
    DuplicateTransaction(i64),
    #[error("No payment reference could be extracted from the transfer text")]
    UnresolvedPaymentReference,
    #[error("The referenced payment {0} does not exist")]
    PaymentNotFound(i64),
    #[error("Payment {0} has already been settled")]
    PaymentAlreadySettled(i64),
    #[error("Payment {0} is closed and can no longer be settled")]
    PaymentClosed(i64),
    #[error("Transfer amount {actual} does not match the {expected} owed on payment {payment_id}")]
    AmountMismatch { payment_id: i64, expected: Vnd, actual: Vnd },
    #[error("An order may not move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("The caller is not allowed to access this resource")]
    Forbidden,
    #[error("{0}")]
    PricingError(#[from] PricingError),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}
