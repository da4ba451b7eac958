//! Stateless pub-sub plumbing for engine events.
//!
//! Producers are cheap clones of an mpsc sender; the handler side drains the channel and spawns the registered
//! async handler per event. Handlers receive nothing but the event value, which keeps them decoupled from the
//! transactional core: a slow or failing handler can never block or roll back a settlement.
use std::{
    future::Future,
    pin::Pin,
    sync::{atomic::AtomicI64, Arc},
};

use log::*;
use tokio::sync::mpsc;

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, then waits for in-flight handler invocations to finish.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // The handler holds its own sender only so `subscribe` can hand out producers; drop it here so the loop
        // terminates once the last external producer goes away.
        drop(self.sender);
        let in_flight = Arc::new(AtomicI64::new(0));
        while let Some(event) = self.listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            in_flight.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let counter = Arc::clone(&in_flight);
            tokio::spawn(async move {
                (handler)(event).await;
                counter.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                trace!("📬️ Event handled");
            });
        }
        while in_flight.load(std::sync::atomic::Ordering::SeqCst) > 0 {
            debug!("📬️ Waiting for in-flight event handlers to complete");
            tokio::time::sleep(tokio::time::Duration::from_millis(250)).await;
        }
        debug!("📬️ Event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Fire-and-forget: a publish failure is logged and swallowed.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}
