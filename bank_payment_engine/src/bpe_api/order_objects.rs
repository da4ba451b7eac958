use serde::{Deserialize, Serialize};

use crate::helpers::pricing::{CheckoutItem, Discount};

/// A checkout as submitted by the storefront: the cart items plus the resolved terms of an optional discount code.
/// Code lookup happens upstream; the engine only validates the terms and does the math.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub discount: Option<Discount>,
}
