use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        payment_webhook::{NewPaymentEvent, PaymentEventProfile, PaymentEventRepo},
        subscription_ledger::{
            LedgerWrite, NewSubscription, PlanState, SubscriptionLedgerRepo, SubscriptionProfile,
        },
    },
    domain::entities::subscription::SubscriptionStatus,
};

// ============================================================================
// InMemorySubscriptionLedgerRepo
// ============================================================================

#[derive(Default)]
struct LedgerState {
    /// Insertion order; the newest row is last.
    subscriptions: Vec<SubscriptionProfile>,
    users: HashMap<Uuid, PlanState>,
}

/// Both tables live behind one lock so a write is all-or-nothing, like the
/// Postgres transaction.
#[derive(Default)]
pub struct InMemorySubscriptionLedgerRepo {
    state: Mutex<LedgerState>,
    fail_writes: AtomicBool,
}

impl InMemorySubscriptionLedgerRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with a database error until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock().unwrap().subscriptions.len()
    }

    fn check_writable(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionLedgerRepo for InMemorySubscriptionLedgerRepo {
    async fn record_activation(&self, input: &NewSubscription) -> AppResult<LedgerWrite> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();

        if let Some(payment_ref) = &input.payment_ref {
            if let Some(existing) = state
                .subscriptions
                .iter()
                .find(|s| s.payment_ref.as_deref() == Some(payment_ref.as_str()))
            {
                return Ok(LedgerWrite::AlreadyApplied(existing.clone()));
            }
        }

        let subscription = SubscriptionProfile {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            plan: input.plan,
            status: SubscriptionStatus::Active,
            amount_minor: input.amount.amount_minor,
            currency: input.amount.currency.clone(),
            period: input.period,
            start_date: input.start_date,
            end_date: input.end_date,
            payment_ref: input.payment_ref.clone(),
            manually_granted: input.manually_granted,
            granted_by: input.granted_by,
            created_at: Utc::now(),
        };
        state.subscriptions.push(subscription.clone());
        state.users.insert(
            input.user_id,
            PlanState {
                user_id: input.user_id,
                plan: input.plan,
                plan_expires_at: Some(input.end_date),
            },
        );

        Ok(LedgerWrite::Inserted(subscription))
    }

    async fn get_plan_state(&self, user_id: Uuid) -> AppResult<Option<PlanState>> {
        Ok(self.state.lock().unwrap().users.get(&user_id).cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionProfile>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn get_by_payment_ref(
        &self,
        payment_ref: &str,
    ) -> AppResult<Option<SubscriptionProfile>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .find(|s| s.payment_ref.as_deref() == Some(payment_ref))
            .cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<SubscriptionProfile>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_canceled(&self, id: Uuid) -> AppResult<SubscriptionProfile> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let subscription = state
            .subscriptions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(AppError::NotFound)?;
        subscription.status = SubscriptionStatus::Canceled;
        Ok(subscription.clone())
    }
}

// ============================================================================
// InMemoryPaymentEventRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPaymentEventRepo {
    events: Mutex<Vec<PaymentEventProfile>>,
    fail_writes: AtomicBool,
}

impl InMemoryPaymentEventRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every recorded event, oldest first.
    pub fn all(&self) -> Vec<PaymentEventProfile> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentEventRepo for InMemoryPaymentEventRepo {
    async fn record(&self, input: &NewPaymentEvent) -> AppResult<PaymentEventProfile> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated write failure".into()));
        }

        let event = PaymentEventProfile {
            id: Uuid::new_v4(),
            payment_id: input.payment_id.clone(),
            event: input.event.clone(),
            outcome: input.outcome,
            user_id: input.user_id,
            reason: input.reason.clone(),
            payload: input.payload.clone(),
            created_at: Utc::now(),
        };
        self.events.lock().unwrap().push(event.clone());
        Ok(event)
    }

    async fn list_by_payment(&self, payment_id: &str) -> AppResult<Vec<PaymentEventProfile>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.payment_id.as_deref() == Some(payment_id))
            .cloned()
            .collect())
    }
}
