//! Caller identity handling.
//!
//! The gateway sits behind the storefront's API layer, which authenticates users and forwards the verified identity
//! in the `x-user-id` and `x-user-roles` headers. Handlers take a [`CallerClaims`] extractor and convert it to the
//! engine's [`CallerContext`] before touching any order, so ownership checks always run against the forwarded
//! identity and never against anything ambient.
//!
//! The bank webhook is authenticated separately, with the static bearer token the gateway was configured with.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::AUTHORIZATION, FromRequest, HttpRequest};
use bank_payment_engine::db_types::{CallerContext, Role};
use bpg_common::Secret;

use crate::errors::{AuthError, ServerError};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

#[derive(Debug, Clone)]
pub struct CallerClaims {
    pub user_id: i64,
    pub roles: Vec<Role>,
}

impl CallerClaims {
    pub fn context(&self) -> CallerContext {
        if self.roles.contains(&Role::Operator) {
            CallerContext::operator(self.user_id)
        } else {
            CallerContext::customer(self.user_id)
        }
    }
}

impl FromRequest for CallerClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}

fn claims_from_request(req: &HttpRequest) -> Result<CallerClaims, ServerError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .ok_or(AuthError::MissingCaller)?
        .to_str()
        .map_err(|e| AuthError::PoorlyFormattedHeader(e.to_string()))?
        .parse::<i64>()
        .map_err(|e| AuthError::PoorlyFormattedHeader(format!("{USER_ID_HEADER}: {e}")))?;
    let roles = match req.headers().get(USER_ROLES_HEADER) {
        Some(value) => {
            let value = value.to_str().map_err(|e| AuthError::PoorlyFormattedHeader(e.to_string()))?;
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<Role>().map_err(|e| AuthError::PoorlyFormattedHeader(e.to_string())))
                .collect::<Result<Vec<Role>, AuthError>>()?
        },
        None => Vec::new(),
    };
    Ok(CallerClaims { user_id, roles })
}

/// Compares the `Authorization: Bearer` header against the configured webhook secret.
pub fn check_webhook_token(req: &HttpRequest, secret: &Secret<String>) -> Result<(), ServerError> {
    if secret.reveal().is_empty() {
        return Err(AuthError::InvalidWebhookToken.into());
    }
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::InvalidWebhookToken)?;
    if token == secret.reveal() {
        Ok(())
    } else {
        Err(AuthError::InvalidWebhookToken.into())
    }
}
