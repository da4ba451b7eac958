//! Realtime payment notifications.
//!
//! Every payment gets its own channel, `payment-{id}`. When a settlement commits, the engine's settled-event hook
//! publishes a `payment` event on that channel and the SSE endpoint streams it to any subscribed storefront tab.
//! Publishing is fire-and-forget: a channel with no subscribers drops the event, and a slow subscriber can never
//! block settlement.
use std::collections::HashMap;

use bank_payment_engine::events::PaymentSettledEvent;
use log::*;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeEvent {
    pub event: String,
    pub payload: serde_json::Value,
}

impl RealtimeEvent {
    pub fn payment_settled(event: &PaymentSettledEvent) -> Self {
        Self {
            event: "payment".to_string(),
            payload: serde_json::json!({
                "status": "success",
                "gateway": event.gateway,
                "paymentId": event.payment_id,
            }),
        }
    }
}

#[derive(Default)]
pub struct RealtimeHub {
    channels: RwLock<HashMap<String, broadcast::Sender<RealtimeEvent>>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payment_channel(payment_id: i64) -> String {
        format!("payment-{payment_id}")
    }

    pub async fn subscribe(&self, channel: &str) -> broadcast::Receiver<RealtimeEvent> {
        let mut channels = self.channels.write().await;
        channels.entry(channel.to_string()).or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0).subscribe()
    }

    /// Best-effort delivery. Events on channels nobody is watching are dropped.
    pub async fn publish(&self, channel: &str, event: RealtimeEvent) {
        let channels = self.channels.read().await;
        match channels.get(channel) {
            Some(sender) => {
                let delivered = sender.send(event).unwrap_or_default();
                trace!("📬️ Published {channel} event to {delivered} subscriber(s)");
            },
            None => trace!("📬️ No subscribers on {channel}. Event dropped."),
        }
    }
}
