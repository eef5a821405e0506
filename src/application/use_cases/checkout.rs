use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::{CreatePaymentRequest, PaymentGatewayPort, PaymentResult},
        use_cases::manual_activation::PlanPricing,
    },
    domain::entities::{
        billing_period::BillingPeriod, money::Money, payment_notification::PaymentMetadata,
        payment_status::GatewayPaymentStatus, plan::Plan,
    },
};

/// Payment state as shown to the buyer while they wait for activation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusView {
    pub id: String,
    pub status: GatewayPaymentStatus,
    pub amount: Money,
    pub paid: bool,
}

/// Thin passthrough to the payment gateway. Creating or reading a payment
/// never changes the user's plan.
#[derive(Clone)]
pub struct CheckoutUseCases {
    gateway: Arc<dyn PaymentGatewayPort>,
    pricing: PlanPricing,
    return_url: String,
}

impl CheckoutUseCases {
    pub fn new(gateway: Arc<dyn PaymentGatewayPort>, pricing: PlanPricing, return_url: String) -> Self {
        Self {
            gateway,
            pricing,
            return_url,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_payment(
        &self,
        user_id: Uuid,
        period: BillingPeriod,
    ) -> AppResult<PaymentResult> {
        let request = CreatePaymentRequest {
            amount: self.pricing.price_for(period).clone(),
            description: format!("PRO subscription, {}", period.label()),
            return_url: self.return_url.clone(),
            metadata: PaymentMetadata {
                user_id,
                plan: Plan::Pro,
                period,
            },
        };

        let result = self.gateway.create_payment(request).await?;
        tracing::info!(
            payment_id = %result.payment_id,
            amount = %result.amount,
            "Payment created"
        );
        Ok(result)
    }

    /// Payments are only visible to the user named in their metadata.
    #[instrument(skip(self))]
    pub async fn check_payment_status(
        &self,
        user_id: Uuid,
        payment_id: &str,
    ) -> AppResult<PaymentStatusView> {
        if payment_id.trim().is_empty() {
            return Err(AppError::InvalidInput("Payment id is required".into()));
        }

        let payment = self
            .gateway
            .get_payment(payment_id)
            .await?
            .ok_or(AppError::NotFound)?;

        match &payment.metadata {
            Some(metadata) if metadata.user_id == user_id => {}
            _ => {
                tracing::debug!(payment_id, "Payment does not belong to caller");
                return Err(AppError::NotFound);
            }
        }

        Ok(PaymentStatusView {
            id: payment.id,
            status: payment.status,
            amount: payment.amount,
            paid: payment.paid,
        })
    }
}
