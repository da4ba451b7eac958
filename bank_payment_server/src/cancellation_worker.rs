use chrono::Duration;
use log::*;
use bank_payment_engine::{events::EventProducers, traits::CancellationOutcome, OrderFlowApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the cancellation worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Each pass fires every stored cancellation job whose delay has elapsed. A job whose payment settled in the
/// meantime is a no-op, so the worker can be restarted or run alongside another instance safely.
pub fn start_cancellation_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    poll_interval: Duration,
) -> JoinHandle<()> {
    let poll_interval = poll_interval.to_std().unwrap_or(std::time::Duration::from_secs(60));
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(poll_interval);
        let api = OrderFlowApi::new(db, producers);
        info!("🕰️ Unpaid payment cancellation worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running unpaid payment cancellation pass");
            match api.run_due_cancellations().await {
                Ok(outcomes) => {
                    let fired = outcomes.iter().filter(|o| !o.noop).count();
                    if fired > 0 {
                        info!("🕰️ {fired} unpaid payments cancelled: {}", outcome_list(&outcomes));
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running the cancellation pass: {e}");
                },
            }
        }
    })
}

fn outcome_list(outcomes: &[CancellationOutcome]) -> String {
    outcomes
        .iter()
        .filter(|o| !o.noop)
        .map(|o| format!("payment #{} ({} orders)", o.payment_id, o.cancelled_orders.len()))
        .collect::<Vec<String>>()
        .join(", ")
}
