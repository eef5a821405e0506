//! Test data factories.
//!
//! Each factory builds a complete, valid value. Use the closure parameter to
//! override specific fields.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    application::{
        ports::payment_gateway::GatewayPayment,
        use_cases::{manual_activation::PlanPricing, subscription_ledger::ActivationRequest},
    },
    domain::entities::{
        billing_period::BillingPeriod, money::Money, payment_notification::PaymentMetadata,
        payment_status::GatewayPaymentStatus, plan::Plan, subscription::ActivationSource,
    },
};

/// Noon UTC on the given date.
pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

pub fn rub(value: &str) -> Money {
    Money::parse(value, "RUB").unwrap()
}

pub fn test_pricing() -> PlanPricing {
    PlanPricing {
        monthly: rub("299.00"),
        yearly: rub("2990.00"),
    }
}

/// Create a webhook-sourced PRO MONTHLY activation for a fresh user.
pub fn create_test_activation(overrides: impl FnOnce(&mut ActivationRequest)) -> ActivationRequest {
    let mut request = ActivationRequest {
        user_id: Uuid::new_v4(),
        plan: Plan::Pro,
        period: BillingPeriod::Monthly,
        payment_ref: Some(format!("pay-{}", Uuid::new_v4())),
        amount: rub("299.00"),
        source: ActivationSource::Webhook,
        granted_by: None,
    };
    overrides(&mut request);
    request
}

/// Create a settled gateway payment owned by `user_id`.
pub fn create_test_gateway_payment(
    id: &str,
    user_id: Uuid,
    overrides: impl FnOnce(&mut GatewayPayment),
) -> GatewayPayment {
    let mut payment = GatewayPayment {
        id: id.to_string(),
        status: GatewayPaymentStatus::Succeeded,
        paid: true,
        amount: rub("299.00"),
        metadata: Some(PaymentMetadata {
            user_id,
            plan: Plan::Pro,
            period: BillingPeriod::Monthly,
        }),
    };
    overrides(&mut payment);
    payment
}

/// A gateway notification body for a PRO MONTHLY payment.
pub fn webhook_payload(event: &str, payment_id: &str, user_id: Uuid) -> Value {
    json!({
        "type": "notification",
        "event": event,
        "object": {
            "id": payment_id,
            "status": "succeeded",
            "paid": true,
            "amount": { "value": "299.00", "currency": "RUB" },
            "metadata": {
                "userId": user_id.to_string(),
                "plan": "PRO",
                "period": "MONTHLY"
            }
        }
    })
}
