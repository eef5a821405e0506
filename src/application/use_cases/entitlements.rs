use std::sync::Arc;

use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::use_cases::subscription_ledger::SubscriptionLedgerUseCases,
    domain::entities::plan_limits::{Feature, PlanLimits, resolve_limits},
};

/// Feature gates for the rest of the product, keyed by user.
///
/// `limits_for` backs `/user/plan-limits`. The `ensure_*` gates have no
/// caller in this service; they are the API the wheel editor, image upload
/// and statistics endpoints call before acting.
#[derive(Clone)]
pub struct EntitlementsUseCases {
    ledger: Arc<SubscriptionLedgerUseCases>,
}

impl EntitlementsUseCases {
    pub fn new(ledger: Arc<SubscriptionLedgerUseCases>) -> Self {
        Self { ledger }
    }

    pub async fn limits_for(&self, user_id: Uuid) -> AppResult<PlanLimits> {
        let state = self.ledger.current_plan(user_id).await?;
        Ok(resolve_limits(state.plan))
    }

    pub async fn ensure_can_create_wheel(&self, user_id: Uuid, existing_wheels: i64) -> AppResult<()> {
        Ok(self
            .limits_for(user_id)
            .await?
            .check_wheel_quota(existing_wheels)?)
    }

    pub async fn ensure_segment_count(&self, user_id: Uuid, segments: i64) -> AppResult<()> {
        Ok(self.limits_for(user_id).await?.check_segment_count(segments)?)
    }

    pub async fn ensure_feature(&self, user_id: Uuid, feature: Feature) -> AppResult<()> {
        Ok(self.limits_for(user_id).await?.check_feature(feature)?)
    }
}
