use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use bank_payment_engine::traits::PaymentGatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Duplicate transaction. {0}")]
    DuplicateTransaction(String),
    #[error("Unresolved payment reference. {0}")]
    UnresolvedReference(String),
    #[error("Payment cannot be settled. {0}")]
    PaymentConflict(String),
    #[error("Amount mismatch. {0}")]
    AmountMismatch(String),
    #[error("Invalid status transition. {0}")]
    InvalidTransition(String),
    #[error("Pricing error. {0}")]
    PricingError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingCaller => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedHeader(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidWebhookToken => StatusCode::UNAUTHORIZED,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::DuplicateTransaction(_) => StatusCode::CONFLICT,
            Self::UnresolvedReference(_) => StatusCode::BAD_REQUEST,
            Self::PaymentConflict(_) => StatusCode::CONFLICT,
            Self::AmountMismatch(_) => StatusCode::BAD_REQUEST,
            Self::InvalidTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PricingError(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No caller identity was provided with the request.")]
    MissingCaller,
    #[error("Caller identity header is not in the correct format. {0}")]
    PoorlyFormattedHeader(String),
    #[error("Webhook bearer token is missing or invalid.")]
    InvalidWebhookToken,
}

impl From<PaymentGatewayError> for ServerError {
    fn from(e: PaymentGatewayError) -> Self {
        match e {
            PaymentGatewayError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            PaymentGatewayError::DuplicateTransaction(_) => Self::DuplicateTransaction(e.to_string()),
            PaymentGatewayError::UnresolvedPaymentReference => Self::UnresolvedReference(e.to_string()),
            PaymentGatewayError::PaymentNotFound(_) | PaymentGatewayError::OrderNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            PaymentGatewayError::PaymentAlreadySettled(_) | PaymentGatewayError::PaymentClosed(_) => {
                Self::PaymentConflict(e.to_string())
            },
            PaymentGatewayError::AmountMismatch { .. } => Self::AmountMismatch(e.to_string()),
            PaymentGatewayError::InvalidTransition { .. } => Self::InvalidTransition(e.to_string()),
            PaymentGatewayError::Forbidden => Self::InsufficientPermissions(e.to_string()),
            PaymentGatewayError::PricingError(_) => Self::PricingError(e.to_string()),
        }
    }
}
