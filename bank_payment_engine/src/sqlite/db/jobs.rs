use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{cancellation_job_key, CancellationJob},
    traits::PaymentGatewayError,
};

/// Schedules (or re-schedules) the cancellation job for a payment. The unique `job_key` makes this a true
/// queue-level idempotency key: a duplicate enqueue from a retried checkout replaces the earlier row instead of
/// creating a second job.
pub async fn upsert_cancellation_job(
    payment_id: i64,
    run_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<CancellationJob, PaymentGatewayError> {
    let job: CancellationJob = sqlx::query_as(
        r#"
            INSERT INTO scheduled_jobs (job_key, payment_id, run_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_key) DO UPDATE SET run_at = excluded.run_at
            RETURNING *;
        "#,
    )
    .bind(cancellation_job_key(payment_id))
    .bind(payment_id)
    .bind(run_at)
    .fetch_one(conn)
    .await?;
    debug!("🕰️ Cancellation job [{}] scheduled to fire at {}", job.job_key, job.run_at);
    Ok(job)
}

pub async fn due_jobs(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<CancellationJob>, sqlx::Error> {
    let jobs = sqlx::query_as("SELECT * FROM scheduled_jobs WHERE run_at <= $1 ORDER BY run_at ASC")
        .bind(now)
        .fetch_all(conn)
        .await?;
    Ok(jobs)
}

/// Deletes the job row, returning whether this caller actually claimed it. A `false` result means another worker
/// got there first and the caller must treat the job as already handled.
pub(crate) async fn claim_job(job_id: i64, conn: &mut SqliteConnection) -> Result<bool, PaymentGatewayError> {
    let result = sqlx::query("DELETE FROM scheduled_jobs WHERE id = $1").bind(job_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}
