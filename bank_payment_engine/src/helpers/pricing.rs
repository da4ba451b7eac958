//! Pure checkout pricing. Both the `calculate` preview endpoint and the real checkout flow run through
//! [`price_checkout`], so the totals a customer previews are exactly the totals their payment must cover.
use bpg_common::Vnd;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::NewOrder;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Checkout must contain at least one item")]
    EmptyCheckout,
    #[error("Item prices and quantities must be positive")]
    InvalidItem,
    #[error("The discount expired at {0}")]
    DiscountExpired(DateTime<Utc>),
    #[error("The discount requires a minimum subtotal of {required}, but the cart only totals {subtotal}")]
    DiscountBelowMinimum { required: Vnd, subtotal: Vnd },
    #[error("Discount terms are invalid")]
    InvalidDiscount,
    #[error("The cart total is too large")]
    AmountOverflow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub shop_id: i64,
    pub unit_price: Vnd,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscountKind {
    /// A percentage off each order's item subtotal, rounded down per order.
    Percent(i64),
    /// A fixed amount off the cart, never reducing any order below zero.
    Fixed(Vnd),
}

/// The resolved terms of a discount code. Code lookup lives outside this crate; only the eligibility checks and the
/// arithmetic that touches order totals happen here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub kind: DiscountKind,
    pub min_subtotal: Option<Vnd>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
pub struct PricingConfig {
    pub shipping_fee: Vnd,
    /// Orders whose item subtotal reaches this threshold ship for free.
    pub free_shipping_threshold: Vnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedOrder {
    pub shop_id: i64,
    pub item_subtotal: Vnd,
    pub discount: Vnd,
    pub shipping_fee: Vnd,
    pub total: Vnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
    pub orders: Vec<PricedOrder>,
    pub subtotal: Vnd,
    pub discount: Vnd,
    pub shipping: Vnd,
    pub grand_total: Vnd,
}

impl PricingBreakdown {
    pub fn new_orders(&self, user_id: i64) -> Vec<NewOrder> {
        self.orders.iter().map(|o| NewOrder { user_id, shop_id: o.shop_id, total: o.total }).collect()
    }
}

/// Groups items per shop into one order each, applies the discount if its terms are met, and adds shipping per
/// order. No state is read or written.
pub fn price_checkout(
    items: &[CheckoutItem],
    discount: Option<&Discount>,
    config: &PricingConfig,
    now: DateTime<Utc>,
) -> Result<PricingBreakdown, PricingError> {
    if items.is_empty() {
        return Err(PricingError::EmptyCheckout);
    }
    if items.iter().any(|i| i.unit_price.value() <= 0 || i.quantity <= 0) {
        return Err(PricingError::InvalidItem);
    }
    // Group per shop, preserving the order shops first appear in. Prices and quantities come straight from the
    // request body, so every product and sum is checked.
    let mut orders: Vec<PricedOrder> = Vec::new();
    for item in items {
        let line_total = item.unit_price.checked_mul(item.quantity).ok_or(PricingError::AmountOverflow)?;
        match orders.iter_mut().find(|o| o.shop_id == item.shop_id) {
            Some(order) => {
                order.item_subtotal =
                    order.item_subtotal.checked_add(line_total).ok_or(PricingError::AmountOverflow)?
            },
            None => orders.push(PricedOrder {
                shop_id: item.shop_id,
                item_subtotal: line_total,
                discount: Vnd::default(),
                shipping_fee: Vnd::default(),
                total: Vnd::default(),
            }),
        }
    }
    let subtotal = orders
        .iter()
        .try_fold(Vnd::default(), |acc, o| acc.checked_add(o.item_subtotal))
        .ok_or(PricingError::AmountOverflow)?;

    if let Some(discount) = discount {
        check_eligibility(discount, subtotal, now)?;
        apply_discount(&mut orders, discount.kind);
    }

    for order in &mut orders {
        if order.item_subtotal < config.free_shipping_threshold {
            order.shipping_fee = config.shipping_fee;
        }
        order.total = (order.item_subtotal - order.discount)
            .checked_add(order.shipping_fee)
            .ok_or(PricingError::AmountOverflow)?;
    }

    let discount_total: Vnd = orders.iter().map(|o| o.discount).sum();
    let shipping_total: Vnd = orders.iter().map(|o| o.shipping_fee).sum();
    let grand_total = orders
        .iter()
        .try_fold(Vnd::default(), |acc, o| acc.checked_add(o.total))
        .ok_or(PricingError::AmountOverflow)?;
    Ok(PricingBreakdown { orders, subtotal, discount: discount_total, shipping: shipping_total, grand_total })
}

fn check_eligibility(discount: &Discount, subtotal: Vnd, now: DateTime<Utc>) -> Result<(), PricingError> {
    // Discount terms come from outside this crate. A percentage outside 0..=100 or a negative fixed amount would
    // inflate totals instead of reducing them.
    match discount.kind {
        DiscountKind::Percent(percent) if !(0..=100).contains(&percent) => return Err(PricingError::InvalidDiscount),
        DiscountKind::Fixed(amount) if amount.value() < 0 => return Err(PricingError::InvalidDiscount),
        _ => {},
    }
    if let Some(expires_at) = discount.expires_at {
        if now > expires_at {
            return Err(PricingError::DiscountExpired(expires_at));
        }
    }
    if let Some(required) = discount.min_subtotal {
        if subtotal < required {
            return Err(PricingError::DiscountBelowMinimum { required, subtotal });
        }
    }
    Ok(())
}

fn apply_discount(orders: &mut [PricedOrder], kind: DiscountKind) {
    match kind {
        DiscountKind::Percent(percent) => {
            for order in orders.iter_mut() {
                order.discount = order.item_subtotal.percent_off(percent);
            }
        },
        // Fixed amounts are consumed greedily across orders so the per-order totals always sum to the cart total.
        DiscountKind::Fixed(amount) => {
            let mut remaining = amount;
            for order in orders.iter_mut() {
                let take = if remaining < order.item_subtotal { remaining } else { order.item_subtotal };
                order.discount = take;
                remaining -= take;
            }
        },
    }
}
