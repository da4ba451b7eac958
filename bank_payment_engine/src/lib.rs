//! Bank Payment Engine
//!
//! The transactional core of the storefront's bank-transfer payment gateway. It matches inbound bank webhooks to
//! logical payments, settles orders atomically, and auto-cancels payments that stay unpaid past their timeout.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). You should never need to access the database directly;
//!    use the public API instead. The exception is the data types, defined in [`mod@db_types`], which are public.
//! 2. The engine public API ([`OrderFlowApi`]). Checkout, webhook settlement, order cancellation, and the delayed
//!    cancellation jobs all flow through it. Backends implement [`traits::PaymentGatewayDatabase`] to plug in.
//! 3. Pure helpers ([`mod@helpers`]): the order state machine lives on
//!    [`db_types::OrderStatus`], payment-reference extraction and checkout pricing are free functions. All of it is
//!    testable without a database.
//!
//! The engine also emits a `PaymentSettledEvent` after every committed settlement. Hook handlers run outside the
//! settlement transaction, so realtime notification can never block or roll back a payment.
pub mod db_types;
pub mod events;
pub mod helpers;

mod bpe_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use bpe_api::{order_flow_api::OrderFlowApi, order_objects};
