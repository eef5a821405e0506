use thiserror::Error;

use crate::domain::entities::plan_limits::{PlanViolation, ViolationKind};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Plan limit exceeded: {0}")]
    PlanLimitExceeded(String),

    #[error("Feature not available: {0}")]
    FeatureNotAvailable(String),

    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    InvalidCredentials,
    Forbidden,
    InvalidInput,
    NotFound,
    PlanLimitExceeded,
    FeatureNotAvailable,
    PaymentGatewayError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::PlanLimitExceeded => "PLAN_LIMIT_EXCEEDED",
            ErrorCode::FeatureNotAvailable => "FEATURE_NOT_AVAILABLE",
            ErrorCode::PaymentGatewayError => "PAYMENT_GATEWAY_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl From<PlanViolation> for AppError {
    fn from(violation: PlanViolation) -> Self {
        match violation.kind {
            ViolationKind::FeatureLocked => AppError::FeatureNotAvailable(violation.message),
            ViolationKind::WheelLimit | ViolationKind::SegmentLimit => {
                AppError::PlanLimitExceeded(violation.message)
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
