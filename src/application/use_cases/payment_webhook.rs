use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::PaymentGatewayPort,
        use_cases::subscription_ledger::{ActivationRequest, SubscriptionLedgerUseCases},
    },
    domain::entities::{
        payment_notification::{
            CanceledPayment, EVENT_PAYMENT_CANCELED, EVENT_PAYMENT_SUCCEEDED, PaymentNotification,
            SucceededPayment,
        },
        subscription::{ActivationSource, PaymentEventOutcome},
    },
};

// ============================================================================
// Audit log
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEventProfile {
    pub id: Uuid,
    pub payment_id: Option<String>,
    pub event: String,
    pub outcome: PaymentEventOutcome,
    pub user_id: Option<Uuid>,
    pub reason: Option<String>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentEvent {
    pub payment_id: Option<String>,
    pub event: String,
    pub outcome: PaymentEventOutcome,
    pub user_id: Option<Uuid>,
    pub reason: Option<String>,
    pub payload: Value,
}

#[async_trait]
pub trait PaymentEventRepo: Send + Sync {
    async fn record(&self, input: &NewPaymentEvent) -> AppResult<PaymentEventProfile>;
    async fn list_by_payment(&self, payment_id: &str) -> AppResult<Vec<PaymentEventProfile>>;
}

// ============================================================================
// Outcome
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied { subscription_id: Uuid },
    Duplicate { subscription_id: Uuid },
    CancelRecorded,
    Ignored { event: String },
    Rejected { reason: String },
}

/// Whether a webhook failure should be reported to the gateway as retryable.
///
/// Retryable errors produce a 5xx so the gateway redelivers. Everything else
/// is acknowledged with 2xx and only logged.
pub fn is_retryable_error(error: &AppError) -> bool {
    match error {
        // Transient errors - retry may succeed
        AppError::Database(_) => true,
        AppError::Internal(_) => true,
        AppError::PaymentGateway(_) => true,

        // Expected conditions - won't change with retry
        AppError::NotFound => false,
        AppError::InvalidInput(_) => false,
        AppError::Forbidden => false,
        AppError::InvalidCredentials => false,
        AppError::PlanLimitExceeded(_) => false,
        AppError::FeatureNotAvailable(_) => false,
    }
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct PaymentWebhookUseCases {
    ledger: Arc<SubscriptionLedgerUseCases>,
    events: Arc<dyn PaymentEventRepo>,
    /// When set, successful payments are re-checked with the gateway before
    /// anything is granted.
    confirm_with: Option<Arc<dyn PaymentGatewayPort>>,
}

impl PaymentWebhookUseCases {
    pub fn new(
        ledger: Arc<SubscriptionLedgerUseCases>,
        events: Arc<dyn PaymentEventRepo>,
        confirm_with: Option<Arc<dyn PaymentGatewayPort>>,
    ) -> Self {
        Self {
            ledger,
            events,
            confirm_with,
        }
    }

    /// Handle one gateway notification.
    ///
    /// `Err` is returned only for failures worth a redelivery; malformed or
    /// unverifiable notifications come back as [`WebhookOutcome::Rejected`].
    #[instrument(skip_all)]
    pub async fn ingest(&self, payload: &Value) -> AppResult<WebhookOutcome> {
        let notification = match PaymentNotification::parse(payload) {
            Ok(n) => n,
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(
                    reason = %reason,
                    event = payload["event"].as_str().unwrap_or("<none>"),
                    "Rejected malformed payment notification"
                );
                self.record_rejection(payload, None, None, &reason).await;
                return Ok(WebhookOutcome::Rejected { reason });
            }
        };

        match notification {
            PaymentNotification::Succeeded(payment) => self.on_succeeded(payload, payment).await,
            PaymentNotification::Canceled(payment) => self.on_canceled(payload, payment).await,
            PaymentNotification::Unknown { event, payment_id } => {
                tracing::debug!(event = %event, payment_id = ?payment_id, "Ignoring unhandled payment event");
                Ok(WebhookOutcome::Ignored { event })
            }
        }
    }

    pub async fn events_for_payment(&self, payment_id: &str) -> AppResult<Vec<PaymentEventProfile>> {
        self.events.list_by_payment(payment_id).await
    }

    async fn on_succeeded(
        &self,
        payload: &Value,
        payment: SucceededPayment,
    ) -> AppResult<WebhookOutcome> {
        let user_id = payment.metadata.user_id;

        if let Some(reason) = self.confirmation_failure(&payment).await? {
            tracing::warn!(
                payment_id = %payment.payment_id,
                user_id = %user_id,
                reason = %reason,
                "Gateway did not confirm payment, nothing granted"
            );
            self.record_rejection(payload, Some(&payment.payment_id), Some(user_id), &reason)
                .await;
            return Ok(WebhookOutcome::Rejected { reason });
        }

        let activation = self
            .ledger
            .activate(ActivationRequest {
                user_id,
                plan: payment.metadata.plan,
                period: payment.metadata.period,
                payment_ref: Some(payment.payment_id.clone()),
                amount: payment.amount,
                source: ActivationSource::Webhook,
                granted_by: None,
            })
            .await;

        let activation = match activation {
            Ok(a) => a,
            Err(e) if is_retryable_error(&e) => {
                tracing::error!(
                    error = %e,
                    payment_id = %payment.payment_id,
                    user_id = %user_id,
                    retryable = true,
                    "Failed to apply payment, gateway will redeliver"
                );
                return Err(e);
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(
                    error = %e,
                    payment_id = %payment.payment_id,
                    user_id = %user_id,
                    retryable = false,
                    "Payment could not be applied"
                );
                self.record_rejection(payload, Some(&payment.payment_id), Some(user_id), &reason)
                    .await;
                return Ok(WebhookOutcome::Rejected { reason });
            }
        };

        let subscription_id = activation.subscription.id;
        let (outcome, result) = if activation.applied {
            (
                PaymentEventOutcome::Applied,
                WebhookOutcome::Applied { subscription_id },
            )
        } else {
            (
                PaymentEventOutcome::Duplicate,
                WebhookOutcome::Duplicate { subscription_id },
            )
        };

        self.events
            .record(&NewPaymentEvent {
                payment_id: Some(payment.payment_id.clone()),
                event: EVENT_PAYMENT_SUCCEEDED.to_string(),
                outcome,
                user_id: Some(user_id),
                reason: None,
                payload: payload.clone(),
            })
            .await?;

        tracing::info!(
            payment_id = %payment.payment_id,
            user_id = %user_id,
            subscription_id = %subscription_id,
            outcome = %outcome,
            "Payment notification processed"
        );
        Ok(result)
    }

    async fn on_canceled(
        &self,
        payload: &Value,
        payment: CanceledPayment,
    ) -> AppResult<WebhookOutcome> {
        tracing::info!(
            payment_id = %payment.payment_id,
            user_id = %payment.metadata.user_id,
            amount = ?payment.amount.as_ref().map(ToString::to_string),
            "Payment canceled, recording for audit"
        );

        self.events
            .record(&NewPaymentEvent {
                payment_id: Some(payment.payment_id.clone()),
                event: EVENT_PAYMENT_CANCELED.to_string(),
                outcome: PaymentEventOutcome::CancelRecorded,
                user_id: Some(payment.metadata.user_id),
                reason: None,
                payload: payload.clone(),
            })
            .await?;

        Ok(WebhookOutcome::CancelRecorded)
    }

    /// `Ok(Some(reason))` when the gateway disagrees with the notification
    /// on status, owner, plan, period or amount.
    async fn confirmation_failure(&self, payment: &SucceededPayment) -> AppResult<Option<String>> {
        let Some(gateway) = &self.confirm_with else {
            return Ok(None);
        };

        let remote = match gateway.get_payment(&payment.payment_id).await {
            Ok(Some(remote)) => remote,
            Ok(None) => return Ok(Some("payment unknown to gateway".to_string())),
            Err(e) if is_retryable_error(&e) => return Err(e),
            Err(e) => return Ok(Some(format!("gateway lookup failed: {e}"))),
        };

        if !(remote.status.is_successful() && remote.paid) {
            return Ok(Some(format!(
                "gateway reports status {} (paid: {})",
                remote.status, remote.paid
            )));
        }
        // The body is unauthenticated: everything the activation uses must
        // match what the gateway itself recorded for this payment.
        match &remote.metadata {
            None => return Ok(Some("gateway payment carries no metadata".to_string())),
            Some(metadata) if *metadata != payment.metadata => {
                return Ok(Some(format!(
                    "gateway metadata ({}, {}, {}) does not match notification",
                    metadata.user_id, metadata.plan, metadata.period
                )));
            }
            Some(_) => {}
        }
        if remote.amount != payment.amount {
            return Ok(Some(format!(
                "gateway amount {} does not match notification amount {}",
                remote.amount, payment.amount
            )));
        }
        Ok(None)
    }

    /// Best effort. A failed audit write must not turn a rejection into a retry loop.
    async fn record_rejection(
        &self,
        payload: &Value,
        payment_id: Option<&str>,
        user_id: Option<Uuid>,
        reason: &str,
    ) {
        let input = NewPaymentEvent {
            payment_id: payment_id
                .map(str::to_string)
                .or_else(|| payload["object"]["id"].as_str().map(str::to_string)),
            event: payload["event"].as_str().unwrap_or("unknown").to_string(),
            outcome: PaymentEventOutcome::Rejected,
            user_id,
            reason: Some(reason.to_string()),
            payload: payload.clone(),
        };
        if let Err(e) = self.events.record(&input).await {
            tracing::warn!(error = %e, "Failed to record rejected payment notification");
        }
    }
}
