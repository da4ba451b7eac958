use bpg_common::Vnd;
use serde::{Deserialize, Serialize};

use crate::db_types::{NewOrder, Order, Payment};

/// Everything checkout needs persisted in one transaction: the payment row and its covered orders. The delayed
/// cancellation job is scheduled as part of the same transaction.
#[derive(Debug, Clone)]
pub struct NewCheckout {
    pub user_id: i64,
    pub orders: Vec<NewOrder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResult {
    pub payment: Payment,
    pub orders: Vec<Order>,
}

/// What a successful settlement hands back for notification: who paid, which payment, and which orders advanced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementOutcome {
    pub payment_id: i64,
    pub user_id: i64,
    pub amount: Vnd,
    pub orders: Vec<Order>,
}

/// The result of one cancellation-job firing. `noop` is true when the payment was already settled (or the job was
/// claimed by another worker) and nothing changed.
#[derive(Debug, Clone)]
pub struct CancellationOutcome {
    pub payment_id: i64,
    pub cancelled_orders: Vec<Order>,
    pub noop: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: Option<u64>,
    pub count: Option<u64>,
}

impl Pagination {
    const DEFAULT_PAGE_SIZE: u64 = 50;

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }

    pub fn count(&self) -> u64 {
        self.count.unwrap_or(Self::DEFAULT_PAGE_SIZE)
    }
}
