use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{ports::clock::Clock, use_cases::manual_activation::Actor},
    domain::entities::{
        billing_period::BillingPeriod,
        money::Money,
        plan::Plan,
        subscription::{ActivationSource, SubscriptionStatus},
    },
};

// ============================================================================
// Profiles & Inputs
// ============================================================================

/// One row of the append-only subscription history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub amount_minor: i64,
    pub currency: String,
    pub period: BillingPeriod,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Gateway payment id for webhook activations; `None` for manual ones.
    pub payment_ref: Option<String>,
    pub manually_granted: bool,
    pub granted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Current plan of a user. PRO rows always carry an expiry, FREE rows never do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanState {
    pub user_id: Uuid,
    pub plan: Plan,
    pub plan_expires_at: Option<DateTime<Utc>>,
}

impl PlanState {
    pub fn free(user_id: Uuid) -> Self {
        Self {
            user_id,
            plan: Plan::Free,
            plan_expires_at: None,
        }
    }

    pub fn is_pro(&self) -> bool {
        self.plan == Plan::Pro
    }

    /// Plans are not downgraded automatically; this only reports that the
    /// stored expiry is in the past.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.plan_expires_at.is_some_and(|expires| expires <= now)
    }
}

#[derive(Debug, Clone)]
pub struct ActivationRequest {
    pub user_id: Uuid,
    pub plan: Plan,
    pub period: BillingPeriod,
    /// Dedup key. Present for gateway payments, absent for manual activations.
    pub payment_ref: Option<String>,
    pub amount: Money,
    pub source: ActivationSource,
    pub granted_by: Option<Uuid>,
}

/// Fully resolved row handed to the repository.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_id: Uuid,
    pub plan: Plan,
    pub period: BillingPeriod,
    pub amount: Money,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub payment_ref: Option<String>,
    pub manually_granted: bool,
    pub granted_by: Option<Uuid>,
}

/// Result of the atomic insert-and-upsert.
#[derive(Debug, Clone)]
pub enum LedgerWrite {
    /// New row written and the user's plan updated in the same transaction.
    Inserted(SubscriptionProfile),
    /// The payment reference was already recorded; nothing was written.
    AlreadyApplied(SubscriptionProfile),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activation {
    pub subscription: SubscriptionProfile,
    /// `false` when the activation replayed an already-applied payment.
    pub applied: bool,
}

// ============================================================================
// Repository
// ============================================================================

#[async_trait]
pub trait SubscriptionLedgerRepo: Send + Sync {
    /// Insert the subscription row and set the user's plan and expiry
    /// atomically. When `payment_ref` is set and already present, returns
    /// the existing row and leaves the user untouched.
    async fn record_activation(&self, input: &NewSubscription) -> AppResult<LedgerWrite>;
    async fn get_plan_state(&self, user_id: Uuid) -> AppResult<Option<PlanState>>;
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionProfile>>;
    async fn get_by_payment_ref(&self, payment_ref: &str)
    -> AppResult<Option<SubscriptionProfile>>;
    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<SubscriptionProfile>>;
    async fn mark_canceled(&self, id: Uuid) -> AppResult<SubscriptionProfile>;
}

// ============================================================================
// Use Cases
// ============================================================================

/// Sole writer of `plan` and `plan_expires_at`.
#[derive(Clone)]
pub struct SubscriptionLedgerUseCases {
    repo: Arc<dyn SubscriptionLedgerRepo>,
    clock: Arc<dyn Clock>,
}

impl SubscriptionLedgerUseCases {
    pub fn new(repo: Arc<dyn SubscriptionLedgerRepo>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[instrument(skip(self, request), fields(user_id = %request.user_id, source = %request.source))]
    pub async fn activate(&self, request: ActivationRequest) -> AppResult<Activation> {
        if !request.plan.is_purchasable() {
            return Err(AppError::InvalidInput(format!(
                "Plan {} cannot be activated",
                request.plan
            )));
        }
        if request.amount.amount_minor < 0 {
            return Err(AppError::InvalidInput("Amount must not be negative".into()));
        }
        let payment_ref = match request.payment_ref {
            Some(r) if r.trim().is_empty() => {
                return Err(AppError::InvalidInput("Payment reference is empty".into()));
            }
            other => other,
        };

        // Cheap replay check outside the transaction. The repository still
        // enforces uniqueness for concurrent deliveries.
        if let Some(ref payment_ref) = payment_ref {
            if let Some(existing) = self.repo.get_by_payment_ref(payment_ref).await? {
                tracing::info!(
                    payment_ref = %payment_ref,
                    subscription_id = %existing.id,
                    "Payment already applied, skipping"
                );
                return Ok(Activation {
                    subscription: existing,
                    applied: false,
                });
            }
        }

        let start_date = self.clock.now();
        let end_date = request.period.end_date(start_date).ok_or_else(|| {
            AppError::Internal(format!("Cannot compute period end from {start_date}"))
        })?;

        let input = NewSubscription {
            user_id: request.user_id,
            plan: request.plan,
            period: request.period,
            amount: request.amount,
            start_date,
            end_date,
            payment_ref,
            manually_granted: request.source == ActivationSource::Manual,
            granted_by: request.granted_by,
        };

        match self.repo.record_activation(&input).await? {
            LedgerWrite::Inserted(subscription) => {
                tracing::info!(
                    subscription_id = %subscription.id,
                    plan = %subscription.plan,
                    period = %subscription.period,
                    end_date = %subscription.end_date,
                    "Subscription activated"
                );
                Ok(Activation {
                    subscription,
                    applied: true,
                })
            }
            LedgerWrite::AlreadyApplied(subscription) => {
                tracing::info!(
                    subscription_id = %subscription.id,
                    "Concurrent delivery already applied this payment"
                );
                Ok(Activation {
                    subscription,
                    applied: false,
                })
            }
        }
    }

    /// Users without a stored row are on FREE.
    pub async fn current_plan(&self, user_id: Uuid) -> AppResult<PlanState> {
        let state = self
            .repo
            .get_plan_state(user_id)
            .await?
            .unwrap_or_else(|| PlanState::free(user_id));

        if state.is_expired(self.clock.now()) {
            tracing::warn!(
                user_id = %user_id,
                expires_at = ?state.plan_expires_at,
                "PRO plan is past its expiry and has not been renewed"
            );
        }
        Ok(state)
    }

    pub async fn list_subscriptions(&self, user_id: Uuid) -> AppResult<Vec<SubscriptionProfile>> {
        self.repo.list_by_user(user_id).await
    }

    /// Mark a subscription row CANCELED. The user's plan is left as is.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        actor: &Actor,
    ) -> AppResult<SubscriptionProfile> {
        if !actor.is_support {
            return Err(AppError::Forbidden);
        }

        let subscription = self
            .repo
            .get_by_id(subscription_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !subscription
            .status
            .can_transition_to(SubscriptionStatus::Canceled)
        {
            return Ok(subscription);
        }

        let canceled = self.repo.mark_canceled(subscription_id).await?;
        tracing::info!(
            subscription_id = %subscription_id,
            user_id = %canceled.user_id,
            "Subscription canceled by support"
        );
        Ok(canceled)
    }
}
