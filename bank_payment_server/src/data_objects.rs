use bank_payment_engine::db_types::{NewBankTransaction, TransferType};
use bpg_common::Vnd;
use serde::{Deserialize, Serialize};

/// The JSON body the bank gateway POSTs to `/payment/receiver`. Field names and the
/// `yyyy-MM-dd HH:mm:ss` timestamp format are fixed by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankWebhookPayload {
    /// The bank's own transaction identifier. Unique per transfer; replays carry the same id.
    pub id: i64,
    pub gateway: String,
    #[serde(with = "webhook_date_format")]
    pub transaction_date: chrono::DateTime<chrono::Utc>,
    pub account_number: Option<String>,
    pub code: Option<String>,
    pub content: Option<String>,
    pub transfer_type: TransferType,
    pub transfer_amount: Vnd,
    pub accumulated: Vnd,
    pub sub_account: Option<String>,
    pub reference_code: Option<String>,
    pub description: String,
}

impl From<BankWebhookPayload> for NewBankTransaction {
    fn from(payload: BankWebhookPayload) -> Self {
        Self {
            txid: payload.id,
            gateway: payload.gateway,
            transaction_date: payload.transaction_date,
            account_number: payload.account_number,
            code: payload.code,
            content: payload.content,
            transfer_type: payload.transfer_type,
            amount: payload.transfer_amount,
            accumulated: payload.accumulated,
            sub_account: payload.sub_account,
            reference_code: payload.reference_code,
            description: payload.description,
        }
    }
}

/// The gateway sends naive local timestamps, e.g. "2024-05-25 21:11:02". They are stored as UTC as-is.
mod webhook_date_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map(|dt| dt.and_utc()).map_err(serde::de::Error::custom)
    }
}

/// Query parameters for the order list endpoint. `user_id` is only honoured for operators.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListQuery {
    pub user_id: Option<i64>,
    pub offset: Option<u64>,
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into() }
    }
}
