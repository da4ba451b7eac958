use sqlx::SqliteConnection;

use crate::{
    db_types::{BankTransaction, NewBankTransaction},
    traits::PaymentGatewayError,
};

/// Appends a webhook payload to the audit log. The UNIQUE constraint on `txid` turns a replayed webhook into
/// [`PaymentGatewayError::DuplicateTransaction`] without touching any other state.
pub async fn insert_transaction(
    txn: NewBankTransaction,
    conn: &mut SqliteConnection,
) -> Result<BankTransaction, PaymentGatewayError> {
    let txid = txn.txid;
    let record = sqlx::query_as(
        r#"
            INSERT INTO bank_transactions (
                txid,
                gateway,
                transaction_date,
                account_number,
                code,
                content,
                transfer_type,
                amount,
                accumulated,
                sub_account,
                reference_code,
                description
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(txn.txid)
    .bind(txn.gateway)
    .bind(txn.transaction_date)
    .bind(txn.account_number)
    .bind(txn.code)
    .bind(txn.content)
    .bind(txn.transfer_type)
    .bind(txn.amount)
    .bind(txn.accumulated)
    .bind(txn.sub_account)
    .bind(txn.reference_code)
    .bind(txn.description)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => PaymentGatewayError::DuplicateTransaction(txid),
        _ => PaymentGatewayError::from(e),
    })?;
    Ok(record)
}

/// Links a settled audit row to the payment it paid for. The payload itself stays immutable.
pub(crate) async fn link_to_payment(
    txid: i64,
    payment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentGatewayError> {
    sqlx::query("UPDATE bank_transactions SET payment_id = $1 WHERE txid = $2")
        .bind(payment_id)
        .bind(txid)
        .execute(conn)
        .await?;
    Ok(())
}
