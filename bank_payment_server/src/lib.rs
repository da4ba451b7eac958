//! # Bank payment gateway server
//! This module hosts the HTTP boundary of the payment gateway. It is responsible for:
//! Listening for incoming webhook calls from the bank gateway.
//! Serving the order checkout, listing, detail, cancellation, and pricing-preview endpoints.
//! Streaming realtime settlement notifications to subscribed storefront clients.
//! Running the background worker that cancels payments left unpaid past their timeout.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/payment/receiver`: The webhook route the bank gateway POSTs transfer notifications to.
//! * `/payment/{id}/events`: An SSE stream carrying settlement notifications for one payment.
//! * `/orders`, `/orders/{id}`, `/orders/calculate`: The order lifecycle endpoints.

pub mod auth;
pub mod cancellation_worker;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod realtime;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
