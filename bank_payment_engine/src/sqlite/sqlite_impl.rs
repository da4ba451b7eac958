//! `SqliteDatabase` is a concrete implementation of the payment reconciliation backend.
//!
//! Every mutating method opens one transaction; the Payment + covered Orders tuple is only ever guarded by that
//! transaction, so the database decides races between concurrent webhook deliveries, user cancels, and the
//! cancellation worker, even across server instances.
use std::fmt::Debug;

use bpg_common::Vnd;
use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{jobs, new_pool, orders, payments, transactions};
use crate::{
    db_types::{
        BankTransaction,
        CancellationJob,
        NewBankTransaction,
        Order,
        OrderStatus,
        Payment,
        PaymentStatus,
    },
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

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, PaymentGatewayError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_checkout(
        &self,
        checkout: NewCheckout,
        cancel_at: DateTime<Utc>,
    ) -> Result<CheckoutResult, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::insert_payment(checkout.user_id, &mut tx).await?;
        let mut inserted = Vec::with_capacity(checkout.orders.len());
        for order in checkout.orders {
            let order = orders::insert_order(order, payment.id, &mut tx).await?;
            inserted.push(order);
        }
        // Scheduling inside the checkout transaction means a payment row can never exist without its timeout job.
        jobs::upsert_cancellation_job(payment.id, cancel_at, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Checkout saved. Payment #{} covers {} orders.", payment.id, inserted.len());
        Ok(CheckoutResult { payment, orders: inserted })
    }

    async fn record_transaction(&self, txn: NewBankTransaction) -> Result<BankTransaction, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let record = transactions::insert_transaction(txn, &mut conn).await?;
        debug!("🗃️ Bank transaction {} from {} recorded in the audit log", record.txid, record.gateway);
        Ok(record)
    }

    async fn settle_payment(
        &self,
        txid: i64,
        payment_id: i64,
        amount: Vnd,
    ) -> Result<SettlementOutcome, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment(payment_id, &mut tx)
            .await?
            .ok_or(PaymentGatewayError::PaymentNotFound(payment_id))?;
        match payment.status {
            PaymentStatus::Unpaid => {},
            PaymentStatus::Settled => return Err(PaymentGatewayError::PaymentAlreadySettled(payment_id)),
            PaymentStatus::Failed => return Err(PaymentGatewayError::PaymentClosed(payment_id)),
        }
        let covered = orders::fetch_orders_for_payment(payment_id, &mut tx).await?;
        // The amount owed is derived from live state: orders cancelled before settlement no longer count.
        let pending: Vec<&Order> =
            covered.iter().filter(|o| o.status == OrderStatus::PendingPayment).collect();
        let owed: Vnd = pending.iter().map(|o| o.total).sum();
        if owed != amount {
            debug!("🗃️ Transfer {txid} of {amount} does not cover the {owed} owed on payment #{payment_id}");
            return Err(PaymentGatewayError::AmountMismatch { payment_id, expected: owed, actual: amount });
        }
        let mut settled_orders = Vec::with_capacity(pending.len());
        for order in pending {
            let order = orders::transition_order(order.id, OrderStatus::PendingPackaging, &mut tx).await?;
            trace!("🗃️ Order #{} moved to {}", order.id, order.status);
            settled_orders.push(order);
        }
        payments::update_payment_status(payment_id, PaymentStatus::Settled, &mut tx).await?;
        transactions::link_to_payment(txid, payment_id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Payment #{payment_id} settled by transaction {txid}. {} orders advanced.", settled_orders.len());
        Ok(SettlementOutcome { payment_id, user_id: payment.user_id, amount, orders: settled_orders })
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(
        &self,
        user_id: i64,
        pagination: &Pagination,
    ) -> Result<Vec<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, pagination, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment(payment_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_orders_for_payment(&self, payment_id: i64) -> Result<Vec<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_payment(payment_id, &mut conn).await?;
        Ok(orders)
    }

    async fn cancel_order(&self, order_id: i64) -> Result<Order, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::transition_order(order_id, OrderStatus::Cancelled, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Order #{order_id} cancelled");
        Ok(order)
    }

    async fn due_cancellation_jobs(&self, now: DateTime<Utc>) -> Result<Vec<CancellationJob>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let jobs = jobs::due_jobs(now, &mut conn).await?;
        Ok(jobs)
    }

    async fn expire_unpaid_payment(&self, job: &CancellationJob) -> Result<CancellationOutcome, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        // Claim the job row first: deleting it in the same transaction as the cancellation means a concurrent worker
        // (or a redelivered job) finds nothing to do.
        if !jobs::claim_job(job.id, &mut tx).await? {
            debug!("🗃️ Cancellation job [{}] was already claimed elsewhere", job.job_key);
            return Ok(CancellationOutcome { payment_id: job.payment_id, cancelled_orders: Vec::new(), noop: true });
        }
        let payment = payments::fetch_payment(job.payment_id, &mut tx)
            .await?
            .ok_or(PaymentGatewayError::PaymentNotFound(job.payment_id))?;
        if payment.status != PaymentStatus::Unpaid {
            // Settled (or already failed) before the timeout fired: remove the job and walk away.
            tx.commit().await?;
            debug!("🗃️ Payment #{} is {}; cancellation job is a no-op", payment.id, payment.status);
            return Ok(CancellationOutcome { payment_id: job.payment_id, cancelled_orders: Vec::new(), noop: true });
        }
        let covered = orders::fetch_orders_for_payment(job.payment_id, &mut tx).await?;
        let mut cancelled = Vec::new();
        for order in covered.iter().filter(|o| o.status == OrderStatus::PendingPayment) {
            let order = orders::transition_order(order.id, OrderStatus::Cancelled, &mut tx).await?;
            cancelled.push(order);
        }
        payments::update_payment_status(job.payment_id, PaymentStatus::Failed, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Payment #{} expired unpaid. {} orders cancelled.", job.payment_id, cancelled.len());
        Ok(CancellationOutcome { payment_id: job.payment_id, cancelled_orders: cancelled, noop: false })
    }

    async fn remove_cancellation_job(&self, job_id: i64) -> Result<(), PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        jobs::claim_job(job_id, &mut conn).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}
