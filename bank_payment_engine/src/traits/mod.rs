mod data_objects;
mod payment_gateway_database;

pub use data_objects::{CancellationOutcome, CheckoutResult, NewCheckout, Pagination, SettlementOutcome};
pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError};
