//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use bank_payment_engine::{
    helpers::pricing::price_checkout,
    order_objects::CheckoutRequest,
    traits::{Pagination, PaymentGatewayDatabase},
    OrderFlowApi,
};
use bytes::Bytes;
use chrono::Utc;
use futures::stream;
use log::*;
use tokio::sync::broadcast::error::RecvError;

use crate::{
    auth::{check_webhook_token, CallerClaims},
    config::ServerConfig,
    data_objects::{BankWebhookPayload, MessageResponse, OrderListQuery},
    errors::ServerError,
    realtime::RealtimeHub,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------  Checkout  ----------------------------------------------------
route!(create_order => Post "/orders" impl PaymentGatewayDatabase);
/// Route handler for checkout.
///
/// Prices the cart, creates one order per shop plus the payment that covers them, and schedules the delayed
/// cancellation job. The response carries the payment id the customer must quote in their bank transfer.
pub async fn create_order<B: PaymentGatewayDatabase>(
    claims: CallerClaims,
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️📦️ Received checkout request from user {}", claims.user_id);
    let caller = claims.context();
    let result = api.checkout(&caller, body.into_inner(), &config.pricing, config.unpaid_payment_timeout).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// Route handler for the checkout preview.
///
/// Runs exactly the same pricing as checkout, without writing anything, so previewed totals always match the
/// payment that a real checkout would require.
#[post("/orders/calculate")]
pub async fn calculate_order(
    claims: CallerClaims,
    body: web::Json<CheckoutRequest>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️📦️ Received calculate request from user {}", claims.user_id);
    let request = body.into_inner();
    let breakdown = price_checkout(&request.items, request.discount.as_ref(), &config.pricing, Utc::now())
        .map_err(|e| ServerError::PricingError(e.to_string()))?;
    Ok(HttpResponse::Ok().json(breakdown))
}

//----------------------------------------------   Orders   ----------------------------------------------------
route!(my_orders => Get "/orders" impl PaymentGatewayDatabase);
pub async fn my_orders<B: PaymentGatewayDatabase>(
    claims: CallerClaims,
    query: web::Query<OrderListQuery>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    // Operators may list another user's orders; everyone else gets their own.
    let user_id = query.user_id.unwrap_or(claims.user_id);
    trace!("💻️📦️ Received order list request from user {} for user {user_id}", claims.user_id);
    let pagination = Pagination { offset: query.offset, count: query.count };
    let orders = api.orders_for_user(&claims.context(), user_id, &pagination).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl PaymentGatewayDatabase);
pub async fn order_by_id<B: PaymentGatewayDatabase>(
    claims: CallerClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    trace!("💻️📦️ Received order detail request for order #{order_id}");
    let order = api.order_detail(&claims.context(), order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Put "/orders/{order_id}" impl PaymentGatewayDatabase);
pub async fn cancel_order<B: PaymentGatewayDatabase>(
    claims: CallerClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    info!("💻️📦️ User {} requested cancellation of order #{order_id}", claims.user_id);
    let order = api.cancel_order(&claims.context(), order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------  Webhook   ----------------------------------------------------
route!(payment_webhook => Post "/payment/receiver" impl PaymentGatewayDatabase);
/// Route handler for inbound bank webhooks.
///
/// The gateway authenticates with the static bearer token. Every payload is recorded in the audit log; inbound
/// transfers whose content carries a payment reference settle that payment. Duplicate deliveries (same bank
/// transaction id) are rejected with a 409 and change nothing.
pub async fn payment_webhook<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    body: web::Json<BankWebhookPayload>,
    api: web::Data<OrderFlowApi<B>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    check_webhook_token(&req, &config.webhook_secret)?;
    let payload = body.into_inner();
    info!("💻️🏦️ Received bank transaction {} from {}", payload.id, payload.gateway);
    let outcome = api.process_bank_transfer(&config.payment_prefix, payload.into()).await?;
    let message = match outcome {
        Some(outcome) => {
            format!("Payment #{} settled. {} orders confirmed.", outcome.payment_id, outcome.orders.len())
        },
        None => "Transaction recorded.".to_string(),
    };
    Ok(HttpResponse::Ok().json(MessageResponse::new(message)))
}

//----------------------------------------------  Realtime  ----------------------------------------------------
/// Route handler for the payment notification stream.
///
/// Holds an SSE connection open on the payment's channel. Each settlement notification is framed as a `payment`
/// event. The storefront subscribes after checkout and closes the stream once the payment event arrives.
#[get("/payment/{payment_id}/events")]
pub async fn payment_events(
    _claims: CallerClaims,
    path: web::Path<i64>,
    hub: web::Data<RealtimeHub>,
) -> Result<HttpResponse, ServerError> {
    let payment_id = path.into_inner();
    let channel = RealtimeHub::payment_channel(payment_id);
    trace!("💻️📬️ New subscriber on {channel}");
    let rx = hub.subscribe(&channel).await;
    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let data = serde_json::to_string(&event.payload).unwrap_or_default();
                    let frame = format!("event: {}\ndata: {data}\n\n", event.event);
                    return Some((Ok::<_, ServerError>(Bytes::from(frame)), rx));
                },
                // Skipped messages are stale settlement notifications; keep the stream alive.
                Err(RecvError::Lagged(n)) => {
                    debug!("💻️📬️ Subscriber lagged by {n} events");
                    continue;
                },
                Err(RecvError::Closed) => return None,
            }
        }
    });
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream))
}
