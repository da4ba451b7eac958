use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    bpe_api::order_objects::CheckoutRequest,
    db_types::{CallerContext, NewBankTransaction, Order, TransferType},
    events::{EventProducers, PaymentSettledEvent},
    helpers::{
        extract_payment_id,
        pricing::{price_checkout, PricingConfig},
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

/// `OrderFlowApi` is the primary entry point for checkout, settlement, and cancellation flows. It composes the pure
/// pricing and reference-extraction helpers with the transactional backend, and publishes settlement events to any
/// registered hooks.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: PaymentGatewayDatabase
{
    /// Creates the orders and payment for a checkout and schedules the delayed cancellation job, all in one
    /// transaction. Each shop in the cart becomes its own order; the payment covers them all.
    pub async fn checkout(
        &self,
        caller: &CallerContext,
        request: CheckoutRequest,
        pricing: &PricingConfig,
        unpaid_timeout: Duration,
    ) -> Result<CheckoutResult, PaymentGatewayError> {
        let breakdown = price_checkout(&request.items, request.discount.as_ref(), pricing, Utc::now())?;
        let checkout =
            NewCheckout { user_id: caller.user_id, orders: breakdown.new_orders(caller.user_id) };
        let cancel_at = Utc::now() + unpaid_timeout;
        let result = self.db.create_checkout(checkout, cancel_at).await?;
        debug!(
            "🔄️📦️ Checkout complete for user {}. Payment #{} covers {} orders totalling {}.",
            caller.user_id,
            result.payment.id,
            result.orders.len(),
            breakdown.grand_total
        );
        Ok(result)
    }

    /// Handles one inbound bank webhook. The payload is recorded in the audit log first (the duplicate guard), then
    /// matched to a payment and settled. Outbound transfers are recorded and ignored, returning `None`.
    ///
    /// On a successful settlement the `payment_settled` hook fires after the transaction has committed, so a
    /// notifier outage can never roll back a settlement.
    pub async fn process_bank_transfer(
        &self,
        reference_prefix: &str,
        txn: NewBankTransaction,
    ) -> Result<Option<SettlementOutcome>, PaymentGatewayError> {
        let recorded = self.db.record_transaction(txn).await?;
        if recorded.transfer_type == TransferType::Out {
            debug!("🔄️💰️ Transaction {} is an outbound transfer. Recorded, not settled.", recorded.txid);
            return Ok(None);
        }
        let payment_id =
            extract_payment_id(reference_prefix, recorded.code.as_deref(), recorded.content.as_deref())
                .ok_or(PaymentGatewayError::UnresolvedPaymentReference)?;
        trace!("🔄️💰️ Transaction {} references payment #{payment_id}", recorded.txid);
        let outcome = self.db.settle_payment(recorded.txid, payment_id, recorded.amount).await?;
        self.call_payment_settled_hook(&outcome, &recorded.gateway).await;
        debug!(
            "🔄️💰️ Transaction {} settled payment #{payment_id}. {} orders are awaiting packaging.",
            recorded.txid,
            outcome.orders.len()
        );
        Ok(Some(outcome))
    }

    async fn call_payment_settled_hook(&self, outcome: &SettlementOutcome, gateway: &str) {
        for emitter in &self.producers.payment_settled_producer {
            trace!("🔄️💰️ Notifying payment settled hook subscribers");
            let event = PaymentSettledEvent {
                payment_id: outcome.payment_id,
                user_id: outcome.user_id,
                gateway: gateway.to_string(),
                amount: outcome.amount,
                order_ids: outcome.orders.iter().map(|o| o.id).collect(),
            };
            emitter.publish_event(event).await;
        }
    }

    /// A single order, visible to its owner and to operators only.
    pub async fn order_detail(&self, caller: &CallerContext, order_id: i64) -> Result<Order, PaymentGatewayError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(PaymentGatewayError::OrderNotFound(order_id))?;
        if !caller.may_act_for(order.user_id) {
            return Err(PaymentGatewayError::Forbidden);
        }
        Ok(order)
    }

    /// A user's orders, newest first. Operators may list anyone's; customers only their own.
    pub async fn orders_for_user(
        &self,
        caller: &CallerContext,
        user_id: i64,
        pagination: &Pagination,
    ) -> Result<Vec<Order>, PaymentGatewayError> {
        if !caller.may_act_for(user_id) {
            return Err(PaymentGatewayError::Forbidden);
        }
        self.db.fetch_orders_for_user(user_id, pagination).await
    }

    /// Caller-initiated cancellation. Only the order's owner or an operator may cancel, and the transition must be
    /// one the state machine allows.
    pub async fn cancel_order(&self, caller: &CallerContext, order_id: i64) -> Result<Order, PaymentGatewayError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(PaymentGatewayError::OrderNotFound(order_id))?;
        if !caller.may_act_for(order.user_id) {
            warn!("🔄️📦️ User {} may not cancel order #{order_id}", caller.user_id);
            return Err(PaymentGatewayError::Forbidden);
        }
        self.db.cancel_order(order_id).await
    }

    /// Fires every cancellation job whose delay has elapsed. Job-level failures are logged and skipped so one bad
    /// payment cannot wedge the worker.
    pub async fn run_due_cancellations(&self) -> Result<Vec<CancellationOutcome>, PaymentGatewayError> {
        let jobs = self.db.due_cancellation_jobs(Utc::now()).await?;
        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            match self.db.expire_unpaid_payment(&job).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    // Failed jobs are removed rather than retried; the next worker pass must not spin on them.
                    error!("🔄️🕰️ Cancellation job [{}] failed: {e}", job.job_key);
                    if let Err(e) = self.db.remove_cancellation_job(job.id).await {
                        error!("🔄️🕰️ Could not remove failed job [{}]: {e}", job.job_key);
                    }
                },
            }
        }
        Ok(outcomes)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
