use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Payment, PaymentStatus},
    traits::PaymentGatewayError,
};

pub async fn insert_payment(user_id: i64, conn: &mut SqliteConnection) -> Result<Payment, PaymentGatewayError> {
    let payment: Payment = sqlx::query_as("INSERT INTO payments (user_id) VALUES ($1) RETURNING *")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    debug!("🏦️ Payment #{} created for user {user_id}", payment.id);
    Ok(payment)
}

pub async fn fetch_payment(payment_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(payment_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub(crate) async fn update_payment_status(
    payment_id: i64,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentGatewayError> {
    let result: Option<Payment> =
        sqlx::query_as("UPDATE payments SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(payment_id)
            .fetch_optional(conn)
            .await?;
    result.ok_or(PaymentGatewayError::PaymentNotFound(payment_id))
}
