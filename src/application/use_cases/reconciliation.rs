//! Post-checkout reconciliation.
//!
//! After the buyer returns from the payment page, the webhook may not have
//! been applied yet. The poller re-reads the user's plan on a fixed schedule
//! and, if PRO never shows up, hands back an offer to activate manually.
//! It only ever reads; activation happens solely through the offer.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::{
        ports::clock::Sleeper,
        use_cases::{
            manual_activation::{Actor, ManualActivationUseCases},
            subscription_ledger::{PlanState, SubscriptionLedgerUseCases},
        },
    },
    domain::entities::billing_period::BillingPeriod,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_POLL_ATTEMPTS: u32 = 5;

// ============================================================================
// Cancellation
// ============================================================================

/// Owner side of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

/// Observer side; cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelToken(watch::Receiver<bool>);

pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelToken(rx))
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancelled. Never resolves if the handle is dropped
    /// without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        let signalled = rx.wait_for(|cancelled| *cancelled).await.map(|_| ());
        if signalled.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ============================================================================
// Generic polling
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
    Cancelled { attempts: u32 },
}

/// Sleep, then probe, up to `schedule.max_attempts` times.
///
/// Stops at the first probe that yields `Some`. Cancellation is honoured
/// before each attempt and while sleeping.
pub async fn poll_until<T, F, Fut>(
    schedule: PollSchedule,
    sleeper: &dyn Sleeper,
    cancel: &CancelToken,
    mut probe: F,
) -> PollOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=schedule.max_attempts {
        let completed = attempt - 1;
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled {
                attempts: completed,
            };
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return PollOutcome::Cancelled { attempts: completed };
            }
            _ = sleeper.sleep(schedule.interval) => {}
        }

        if let Some(value) = probe(attempt).await {
            return PollOutcome::Ready {
                value,
                attempts: attempt,
            };
        }
    }

    PollOutcome::Exhausted {
        attempts: schedule.max_attempts,
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Where the poller reads the user's plan from.
#[async_trait]
pub trait PlanStateSource: Send + Sync {
    async fn read_plan(&self, user_id: Uuid) -> AppResult<PlanState>;
}

/// Performs a manual activation on the user's behalf.
#[async_trait]
pub trait ManualActivator: Send + Sync {
    async fn activate_manually(&self, user_id: Uuid, period: BillingPeriod) -> AppResult<PlanState>;
}

#[async_trait]
impl PlanStateSource for SubscriptionLedgerUseCases {
    async fn read_plan(&self, user_id: Uuid) -> AppResult<PlanState> {
        self.current_plan(user_id).await
    }
}

/// In-process activation always acts as the account owner.
#[async_trait]
impl ManualActivator for ManualActivationUseCases {
    async fn activate_manually(&self, user_id: Uuid, period: BillingPeriod) -> AppResult<PlanState> {
        let subscription = self
            .manual_activate(&Actor::user(user_id), user_id, period)
            .await?;
        Ok(PlanState {
            user_id,
            plan: subscription.plan,
            plan_expires_at: Some(subscription.end_date),
        })
    }
}

/// Offered to the buyer when the plan did not flip within the schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualActivationOffer {
    pub user_id: Uuid,
    pub period: BillingPeriod,
    pub message: String,
}

impl ManualActivationOffer {
    fn new(user_id: Uuid, period: BillingPeriod) -> Self {
        Self {
            user_id,
            period,
            message: "Your payment is still being processed. If PRO does not appear shortly, \
                      you can activate it manually."
                .to_string(),
        }
    }

    /// Explicit user action; nothing is activated until this is called.
    pub async fn accept(&self, activator: &dyn ManualActivator) -> AppResult<PlanState> {
        tracing::info!(user_id = %self.user_id, period = %self.period, "Manual activation offer accepted");
        activator.activate_manually(self.user_id, self.period).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationState {
    Checking { attempt: u32 },
    StillFree { attempt: u32 },
    ProConfirmed { expires_at: Option<DateTime<Utc>> },
    TimedOutOfferManual(ManualActivationOffer),
    Cancelled,
}

impl ReconciliationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReconciliationState::ProConfirmed { .. }
                | ReconciliationState::TimedOutOfferManual(_)
                | ReconciliationState::Cancelled
        )
    }
}

pub trait ReconciliationObserver: Send + Sync {
    fn on_state(&self, state: &ReconciliationState);
}

impl<F> ReconciliationObserver for F
where
    F: Fn(&ReconciliationState) + Send + Sync,
{
    fn on_state(&self, state: &ReconciliationState) {
        self(state)
    }
}

#[derive(Clone)]
pub struct ReconciliationPoller {
    source: Arc<dyn PlanStateSource>,
    sleeper: Arc<dyn Sleeper>,
    schedule: PollSchedule,
}

impl ReconciliationPoller {
    pub fn new(source: Arc<dyn PlanStateSource>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self::with_schedule(source, sleeper, PollSchedule::default())
    }

    pub fn with_schedule(
        source: Arc<dyn PlanStateSource>,
        sleeper: Arc<dyn Sleeper>,
        schedule: PollSchedule,
    ) -> Self {
        Self {
            source,
            sleeper,
            schedule,
        }
    }

    /// Wait for the user's plan to become PRO. Returns the terminal state,
    /// which is also the last state reported to `observer`.
    pub async fn run(
        &self,
        user_id: Uuid,
        period: BillingPeriod,
        cancel: &CancelToken,
        observer: &dyn ReconciliationObserver,
    ) -> ReconciliationState {
        let source = &self.source;

        let outcome = poll_until(self.schedule, self.sleeper.as_ref(), cancel, |attempt| async move {
            observer.on_state(&ReconciliationState::Checking { attempt });

            match source.read_plan(user_id).await {
                Ok(state) if state.is_pro() => Some(state),
                Ok(_) => {
                    observer.on_state(&ReconciliationState::StillFree { attempt });
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, user_id = %user_id, attempt, "Plan read failed during reconciliation");
                    observer.on_state(&ReconciliationState::StillFree { attempt });
                    None
                }
            }
        })
        .await;

        let terminal = match outcome {
            PollOutcome::Ready { value, attempts } => {
                tracing::info!(user_id = %user_id, attempts, "PRO plan confirmed");
                ReconciliationState::ProConfirmed {
                    expires_at: value.plan_expires_at,
                }
            }
            PollOutcome::Exhausted { attempts } => {
                tracing::info!(user_id = %user_id, attempts, "Plan still FREE, offering manual activation");
                ReconciliationState::TimedOutOfferManual(ManualActivationOffer::new(user_id, period))
            }
            PollOutcome::Cancelled { attempts } => {
                tracing::debug!(user_id = %user_id, attempts, "Reconciliation cancelled");
                ReconciliationState::Cancelled
            }
        };

        observer.on_state(&terminal);
        terminal
    }
}
