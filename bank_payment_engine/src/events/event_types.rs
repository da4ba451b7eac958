use bpg_common::Vnd;
use serde::{Deserialize, Serialize};

/// Emitted after a settlement transaction has committed. Carries everything a notifier needs to address the
/// per-payment channel without another database round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSettledEvent {
    pub payment_id: i64,
    pub user_id: i64,
    pub gateway: String,
    pub amount: Vnd,
    pub order_ids: Vec<i64>,
}
