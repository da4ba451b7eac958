use std::env;

use bank_payment_engine::helpers::pricing::PricingConfig;
use bpg_common::{Secret, Vnd};
use chrono::Duration;
use log::*;

const DEFAULT_BPG_HOST: &str = "127.0.0.1";
const DEFAULT_BPG_PORT: u16 = 8360;
const DEFAULT_PAYMENT_PREFIX: &str = "DH";
const DEFAULT_UNPAID_PAYMENT_TIMEOUT: Duration = Duration::hours(24);
const DEFAULT_CANCELLATION_POLL_INTERVAL: Duration = Duration::seconds(60);
const DEFAULT_SHIPPING_FEE: Vnd = Vnd::from_vnd(30_000);
const DEFAULT_FREE_SHIPPING_THRESHOLD: Vnd = Vnd::from_vnd(500_000);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Static bearer token that the bank gateway presents on webhook calls.
    pub webhook_secret: Secret<String>,
    /// The prefix the bank transfer content is scanned for when resolving a payment reference,
    /// e.g. "DH" matches "DH1234".
    pub payment_prefix: String,
    /// The time an unpaid payment is allowed to live before its orders are cancelled.
    pub unpaid_payment_timeout: Duration,
    /// How often the cancellation worker polls for due jobs.
    pub cancellation_poll_interval: Duration,
    pub pricing: PricingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BPG_HOST.to_string(),
            port: DEFAULT_BPG_PORT,
            database_url: String::default(),
            webhook_secret: Secret::new(String::default()),
            payment_prefix: DEFAULT_PAYMENT_PREFIX.to_string(),
            unpaid_payment_timeout: DEFAULT_UNPAID_PAYMENT_TIMEOUT,
            cancellation_poll_interval: DEFAULT_CANCELLATION_POLL_INTERVAL,
            pricing: PricingConfig {
                shipping_fee: DEFAULT_SHIPPING_FEE,
                free_shipping_threshold: DEFAULT_FREE_SHIPPING_THRESHOLD,
            },
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BPG_HOST").ok().unwrap_or_else(|| DEFAULT_BPG_HOST.into());
        let port = env::var("BPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BPG_PORT. {e} Using the default, {DEFAULT_BPG_PORT}, instead."
                    );
                    DEFAULT_BPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BPG_PORT);
        let database_url = env::var("BPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BPG_DATABASE_URL is not set. Please set it to the URL for the payment gateway database.");
            String::default()
        });
        let webhook_secret = env::var("BPG_WEBHOOK_SECRET").map(Secret::new).unwrap_or_else(|_| {
            error!(
                "🚨️ BPG_WEBHOOK_SECRET is not set. The payment webhook will reject every call until it is configured."
            );
            Secret::new(String::default())
        });
        let payment_prefix = env::var("BPG_PAYMENT_PREFIX").ok().unwrap_or_else(|| {
            info!("🪛️ BPG_PAYMENT_PREFIX is not set. Using the default, {DEFAULT_PAYMENT_PREFIX}.");
            DEFAULT_PAYMENT_PREFIX.to_string()
        });
        let unpaid_payment_timeout = duration_from_env(
            "BPG_UNPAID_PAYMENT_TIMEOUT",
            Duration::hours,
            "hrs",
            DEFAULT_UNPAID_PAYMENT_TIMEOUT,
            Duration::num_hours,
        );
        let cancellation_poll_interval = duration_from_env(
            "BPG_CANCELLATION_POLL_INTERVAL",
            Duration::seconds,
            "s",
            DEFAULT_CANCELLATION_POLL_INTERVAL,
            Duration::num_seconds,
        );
        let pricing = PricingConfig {
            shipping_fee: vnd_from_env("BPG_SHIPPING_FEE", DEFAULT_SHIPPING_FEE),
            free_shipping_threshold: vnd_from_env("BPG_FREE_SHIPPING_THRESHOLD", DEFAULT_FREE_SHIPPING_THRESHOLD),
        };
        Self {
            host,
            port,
            database_url,
            webhook_secret,
            payment_prefix,
            unpaid_payment_timeout,
            cancellation_poll_interval,
            pricing,
        }
    }
}

fn duration_from_env(
    var: &str,
    to_duration: fn(i64) -> Duration,
    unit: &str,
    default: Duration,
    magnitude: fn(&Duration) -> i64,
) -> Duration {
    env::var(var)
        .map_err(|_| info!("🪛️ {var} is not set. Using the default value of {} {unit}.", magnitude(&default)))
        .and_then(|s| {
            s.parse::<i64>()
                .map(to_duration)
                .map_err(|e| warn!("🪛️ Invalid configuration value for {var}. {e}"))
        })
        .ok()
        .unwrap_or(default)
}

fn vnd_from_env(var: &str, default: Vnd) -> Vnd {
    env::var(var)
        .map_err(|_| info!("🪛️ {var} is not set. Using the default value of {default}."))
        .and_then(|s| {
            s.parse::<i64>().map(Vnd::from_vnd).map_err(|e| warn!("🪛️ Invalid configuration value for {var}. {e}"))
        })
        .ok()
        .unwrap_or(default)
}
