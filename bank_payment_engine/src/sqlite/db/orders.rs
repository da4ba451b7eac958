use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderStatus},
    traits::{Pagination, PaymentGatewayError},
};

/// Inserts a new order row. Not atomic on its own; embed the call in a transaction and pass `&mut *tx` when the
/// order must land together with its payment.
pub async fn insert_order(
    order: NewOrder,
    payment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Order, PaymentGatewayError> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (payment_id, user_id, shop_id, total)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(payment_id)
    .bind(order.user_id)
    .bind(order.shop_id)
    .bind(order.total)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order #{} inserted for payment #{payment_id}", order.id);
    Ok(order)
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND deleted_at IS NULL")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_orders_for_payment(
    payment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE payment_id = $1 AND deleted_at IS NULL ORDER BY id ASC")
        .bind(payment_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// The user's orders, newest first.
pub async fn fetch_orders_for_user(
    user_id: i64,
    pagination: &Pagination,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        "SELECT * FROM orders WHERE user_id = $1 AND deleted_at IS NULL ORDER BY created_at DESC, id DESC LIMIT $2 \
         OFFSET $3",
    )
    .bind(user_id)
    .bind(pagination.count() as i64)
    .bind(pagination.offset() as i64)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// Moves an order to `status`, enforcing the state machine. The check and the write happen on the same connection,
/// so running this inside a transaction makes the transition atomic with its siblings.
pub(crate) async fn transition_order(
    order_id: i64,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, PaymentGatewayError> {
    let order = fetch_order(order_id, conn).await?.ok_or(PaymentGatewayError::OrderNotFound(order_id))?;
    if !order.status.can_transition(status) {
        return Err(PaymentGatewayError::InvalidTransition { from: order.status, to: status });
    }
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(order_id)
            .fetch_optional(conn)
            .await?;
    result.ok_or(PaymentGatewayError::OrderNotFound(order_id))
}
