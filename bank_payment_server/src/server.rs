use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use bank_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    OrderFlowApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    cancellation_worker::start_cancellation_worker,
    config::ServerConfig,
    errors::ServerError,
    realtime::{RealtimeEvent, RealtimeHub},
    routes::{
        calculate_order,
        health,
        payment_events,
        CancelOrderRoute,
        CreateOrderRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        PaymentWebhookRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let hub = Arc::new(RealtimeHub::new());
    let producers = start_realtime_bridge(Arc::clone(&hub)).await;
    start_cancellation_worker(db.clone(), producers.clone(), config.cancellation_poll_interval);
    let srv = create_server_instance(config, db, producers, hub)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Wires the engine's settled-payment hook to the realtime hub. The handler runs on its own task, after the
/// settlement transaction has committed, so notification can never delay or fail a settlement.
pub async fn start_realtime_bridge(hub: Arc<RealtimeHub>) -> EventProducers {
    let mut hooks = EventHooks::default();
    hooks.on_payment_settled(move |event| {
        let hub = Arc::clone(&hub);
        Box::pin(async move {
            let channel = RealtimeHub::payment_channel(event.payment_id);
            debug!("📬️ Payment #{} settled. Notifying {channel}.", event.payment_id);
            hub.publish(&channel, RealtimeEvent::payment_settled(&event)).await;
        })
    });
    let handlers = EventHandlers::new(128, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    producers
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    hub: Arc<RealtimeHub>,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bps::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::from(Arc::clone(&hub)))
            .service(health)
            .service(calculate_order)
            .service(payment_events)
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(PaymentWebhookRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
