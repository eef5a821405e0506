use async_trait::async_trait;
use serde::Serialize;

use crate::{
    app_error::AppResult,
    domain::entities::{
        money::Money, payment_notification::PaymentMetadata,
        payment_status::GatewayPaymentStatus,
    },
};

// ============================================================================
// Port Types
// ============================================================================

/// Everything the gateway needs to open a hosted payment page.
#[derive(Debug, Clone)]
pub struct CreatePaymentRequest {
    pub amount: Money,
    pub description: String,
    /// Where the gateway sends the buyer after paying.
    pub return_url: String,
    /// Echoed back in notifications; the webhook relies on it to find the user.
    pub metadata: PaymentMetadata,
}

/// A freshly created payment, ready for redirect.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub payment_id: String,
    pub confirmation_url: String,
    pub amount: Money,
    pub description: String,
}

/// A payment as the gateway currently sees it.
#[derive(Debug, Clone)]
pub struct GatewayPayment {
    pub id: String,
    pub status: GatewayPaymentStatus,
    pub paid: bool,
    pub amount: Money,
    /// `None` when the payment carries no (or unparseable) metadata.
    pub metadata: Option<PaymentMetadata>,
}

// ============================================================================
// Port
// ============================================================================

/// Outbound payment gateway operations.
///
/// The gateway is an external collaborator: it creates hosted payments and
/// reports their state. Entitlements are never granted from here directly;
/// they flow through the webhook ingestor or the manual activation path.
#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    async fn create_payment(&self, request: CreatePaymentRequest) -> AppResult<PaymentResult>;

    /// Fetch a payment by id. `Ok(None)` when the gateway does not know it.
    async fn get_payment(&self, payment_id: &str) -> AppResult<Option<GatewayPayment>>;
}
