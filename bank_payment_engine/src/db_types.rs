use std::{fmt::Display, str::FromStr};

use bpg_common::Vnd;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------    OrderStatus     ----------------------------------------------------------
/// The order lifecycle. An order starts in `PendingPayment` and only ever moves along the edges encoded in
/// [`OrderStatus::can_transition`]. `Cancelled` and `Returned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created by checkout; no matching bank transfer has been settled yet.
    PendingPayment,
    /// Payment settled; the shop must pack the goods.
    PendingPackaging,
    /// The courier has collected the parcel.
    PickedUp,
    /// The parcel is on its way to the buyer.
    PendingDelivery,
    /// The buyer has received the goods.
    Delivered,
    /// Cancelled by the buyer, an operator, or the payment-timeout job. Terminal.
    Cancelled,
    /// Returned after delivery. Terminal.
    Returned,
}

impl OrderStatus {
    /// The single authority on legal status changes. Every mutating path (settlement, the cancellation job, a
    /// user-initiated cancel) must consult this table before touching an order row.
    pub fn can_transition(self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (PendingPayment, PendingPackaging | Cancelled)
                | (PendingPackaging, PickedUp | Cancelled)
                | (PickedUp, PendingDelivery | Cancelled)
                | (PendingDelivery, Delivered | Cancelled)
                | (Delivered, Returned)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::PendingPayment => "PendingPayment",
            OrderStatus::PendingPackaging => "PendingPackaging",
            OrderStatus::PickedUp => "PickedUp",
            OrderStatus::PendingDelivery => "PendingDelivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Returned => "Returned",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingPayment" => Ok(Self::PendingPayment),
            "PendingPackaging" => Ok(Self::PendingPackaging),
            "PickedUp" => Ok(Self::PickedUp),
            "PendingDelivery" => Ok(Self::PendingDelivery),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            "Returned" => Ok(Self::Returned),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------   PaymentStatus    ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// No bank transfer has been matched against this payment yet.
    Unpaid,
    /// A bank transfer covering the exact amount owed was matched. Set exactly once.
    Settled,
    /// The payment timed out before a transfer arrived; its orders were cancelled.
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "Unpaid"),
            PaymentStatus::Settled => write!(f, "Settled"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unpaid" => Ok(Self::Unpaid),
            "Settled" => Ok(Self::Settled),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------      Order         ----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub payment_id: i64,
    pub user_id: i64,
    pub shop_id: i64,
    pub total: Vnd,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A priced, shop-scoped order waiting to be inserted as part of a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: i64,
    pub shop_id: i64,
    pub total: Vnd,
}

//--------------------------------------     Payment        ----------------------------------------------------------
/// The logical aggregate that a single bank transfer pays for. The amount owed is never stored; it is derived as the
/// sum of the covered orders that are still awaiting payment.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   TransferType     ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferType {
    In,
    Out,
}

impl Display for TransferType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferType::In => write!(f, "in"),
            TransferType::Out => write!(f, "out"),
        }
    }
}

impl FromStr for TransferType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            s => Err(ConversionError(format!("Invalid transfer type: {s}"))),
        }
    }
}

//--------------------------------------  BankTransaction   ----------------------------------------------------------
/// One row of the immutable webhook audit log. `txid` is the bank's own transaction identifier; a UNIQUE constraint
/// on it is the duplicate-webhook guard. `payment_id` is filled in when the transaction settles a payment.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: i64,
    pub txid: i64,
    pub gateway: String,
    pub transaction_date: DateTime<Utc>,
    pub account_number: Option<String>,
    pub code: Option<String>,
    pub content: Option<String>,
    pub transfer_type: TransferType,
    pub amount: Vnd,
    pub accumulated: Vnd,
    pub sub_account: Option<String>,
    pub reference_code: Option<String>,
    pub description: String,
    pub payment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBankTransaction {
    pub txid: i64,
    pub gateway: String,
    pub transaction_date: DateTime<Utc>,
    pub account_number: Option<String>,
    pub code: Option<String>,
    pub content: Option<String>,
    pub transfer_type: TransferType,
    pub amount: Vnd,
    pub accumulated: Vnd,
    pub sub_account: Option<String>,
    pub reference_code: Option<String>,
    pub description: String,
}

//-------------------------------------- CancellationJob    ----------------------------------------------------------
/// A durable, delayed unit of work that cancels a payment's orders if it is still unpaid when the job fires. The
/// `job_key` is derived from the payment id, so re-scheduling replaces the previous row instead of duplicating it.
#[derive(Debug, Clone, FromRow)]
pub struct CancellationJob {
    pub id: i64,
    pub job_key: String,
    pub payment_id: i64,
    pub run_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

pub fn cancellation_job_key(payment_id: i64) -> String {
    format!("cancel-payment-{payment_id}")
}

//--------------------------------------       Role         ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Operator,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Operator => write!(f, "operator"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "operator" => Ok(Self::Operator),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------  CallerContext     ----------------------------------------------------------
/// The identity making a call into the engine. This is an explicit value threaded through every entry point; the
/// engine never reads caller identity from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: i64,
    pub roles: Vec<Role>,
}

impl CallerContext {
    pub fn customer(user_id: i64) -> Self {
        Self { user_id, roles: vec![Role::Customer] }
    }

    pub fn operator(user_id: i64) -> Self {
        Self { user_id, roles: vec![Role::Operator] }
    }

    pub fn is_operator(&self) -> bool {
        self.roles.contains(&Role::Operator)
    }

    /// Operators may act on any user's orders; everyone else only on their own.
    pub fn may_act_for(&self, user_id: i64) -> bool {
        self.is_operator() || self.user_id == user_id
    }
}
