mod payment_reference;
pub mod pricing;

pub use payment_reference::extract_payment_id;
