use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::subscription_ledger::{
        ActivationRequest, SubscriptionLedgerUseCases, SubscriptionProfile,
    },
    domain::entities::{
        billing_period::BillingPeriod, money::Money, plan::Plan, subscription::ActivationSource,
    },
};

/// Authenticated caller of a billing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_support: bool,
}

impl Actor {
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_support: false,
        }
    }

    pub fn support(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_support: true,
        }
    }

    pub fn can_act_for(&self, target_user_id: Uuid) -> bool {
        self.is_support || self.user_id == target_user_id
    }
}

/// PRO list prices, one per billing period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanPricing {
    pub monthly: Money,
    pub yearly: Money,
}

impl PlanPricing {
    pub fn price_for(&self, period: BillingPeriod) -> &Money {
        match period {
            BillingPeriod::Monthly => &self.monthly,
            BillingPeriod::Yearly => &self.yearly,
        }
    }
}

/// Fallback activation path when the payment webhook did not arrive.
#[derive(Clone)]
pub struct ManualActivationUseCases {
    ledger: Arc<SubscriptionLedgerUseCases>,
    pricing: PlanPricing,
}

impl ManualActivationUseCases {
    pub fn new(ledger: Arc<SubscriptionLedgerUseCases>, pricing: PlanPricing) -> Self {
        Self { ledger, pricing }
    }

    pub fn pricing(&self) -> &PlanPricing {
        &self.pricing
    }

    /// Activate PRO for `target_user_id` without a payment reference.
    ///
    /// Every call writes a new subscription row; there is no dedup key.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id, support = actor.is_support))]
    pub async fn manual_activate(
        &self,
        actor: &Actor,
        target_user_id: Uuid,
        period: BillingPeriod,
    ) -> AppResult<SubscriptionProfile> {
        if !actor.can_act_for(target_user_id) {
            tracing::warn!(
                target_user_id = %target_user_id,
                "Manual activation refused for another user's account"
            );
            return Err(AppError::Forbidden);
        }

        let activation = self
            .ledger
            .activate(ActivationRequest {
                user_id: target_user_id,
                plan: Plan::Pro,
                period,
                payment_ref: None,
                amount: self.pricing.price_for(period).clone(),
                source: ActivationSource::Manual,
                granted_by: Some(actor.user_id),
            })
            .await?;

        tracing::info!(
            target_user_id = %target_user_id,
            subscription_id = %activation.subscription.id,
            "Manual PRO activation recorded"
        );
        Ok(activation.subscription)
    }
}
