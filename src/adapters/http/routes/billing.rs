use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{app_state::AppState, auth::current_actor},
    app_error::{AppError, AppResult},
    domain::entities::{billing_period::BillingPeriod, plan::Plan},
    use_cases::{
        payment_webhook::{WebhookOutcome, is_retryable_error},
        subscription_ledger::SubscriptionProfile,
    },
};

#[derive(Deserialize)]
struct PeriodPayload {
    period: BillingPeriod,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpgradeResponse {
    subscription: SubscriptionProfile,
    plan: Plan,
    plan_expires_at: Option<DateTime<Utc>>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/upgrade", post(upgrade))
        .route("/payments", post(create_payment))
        .route("/payments/{payment_id}", get(payment_status))
}

/// Payment gateway notifications.
///
/// Acknowledged with 200 unless the failure is transient, in which case the
/// error status makes the gateway redeliver.
async fn handle_webhook(
    State(app_state): State<AppState>,
    body: String,
) -> AppResult<impl IntoResponse> {
    let payload: serde_json::Value = serde_json::from_str(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {}", e)))?;

    match app_state.webhook.ingest(&payload).await {
        Ok(outcome) => {
            match &outcome {
                WebhookOutcome::Rejected { reason } => {
                    tracing::warn!(reason = %reason, "Payment notification rejected")
                }
                other => tracing::debug!(outcome = ?other, "Payment notification handled"),
            }
        }
        Err(e) if is_retryable_error(&e) => {
            tracing::error!(error = ?e, "Payment notification failed, asking for redelivery");
            return Err(e);
        }
        Err(e) => {
            tracing::warn!(error = ?e, "Payment notification failed permanently");
        }
    }

    Ok((StatusCode::OK, Json(serde_json::json!({ "success": true }))))
}

/// Owner-triggered activation, offered when the webhook has not landed.
async fn upgrade(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    cookies: CookieJar,
    Json(payload): Json<PeriodPayload>,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers, &cookies, &app_state)?;

    let subscription = app_state
        .manual_activation
        .manual_activate(&actor, actor.user_id, payload.period)
        .await?;

    Ok(Json(UpgradeResponse {
        plan: subscription.plan,
        plan_expires_at: Some(subscription.end_date),
        subscription,
    }))
}

async fn create_payment(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    cookies: CookieJar,
    Json(payload): Json<PeriodPayload>,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers, &cookies, &app_state)?;
    let payment = app_state
        .checkout
        .create_payment(actor.user_id, payload.period)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn payment_status(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    cookies: CookieJar,
    Path(payment_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers, &cookies, &app_state)?;
    let status = app_state
        .checkout
        .check_payment_status(actor.user_id, &payment_id)
        .await?;
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use uuid::Uuid;

    use crate::{
        domain::entities::subscription::PaymentEventOutcome,
        test_utils::{
            TestAppStateBuilder, create_test_gateway_payment, issue_test_token, webhook_payload,
        },
    };

    fn build_test_router(app_state: AppState) -> Router<()> {
        router().with_state(app_state)
    }

    // =========================================================================
    // POST /webhook
    // =========================================================================

    #[tokio::test]
    async fn webhook_redelivery_writes_one_subscription() {
        let builder = TestAppStateBuilder::new();
        let ledger_repo = builder.ledger_repo();
        let event_repo = builder.event_repo();
        let app_state = builder.build();
        let server = TestServer::new(build_test_router(app_state.clone())).unwrap();

        let user_id = Uuid::new_v4();
        let payload = webhook_payload("payment.succeeded", "pay-1", user_id);

        for _ in 0..2 {
            let response = server.post("/webhook").json(&payload).await;
            response.assert_status_ok();
            response.assert_json(&serde_json::json!({ "success": true }));
        }

        assert_eq!(ledger_repo.subscription_count(), 1);
        let outcomes: Vec<_> = event_repo.all().into_iter().map(|e| e.outcome).collect();
        assert_eq!(
            outcomes,
            vec![PaymentEventOutcome::Applied, PaymentEventOutcome::Duplicate]
        );
        assert_eq!(
            app_state.ledger.current_plan(user_id).await.unwrap().plan,
            Plan::Pro
        );
    }

    #[tokio::test]
    async fn webhook_invalid_json_returns_400() {
        let server = TestServer::new(build_test_router(TestAppStateBuilder::new().build())).unwrap();

        let response = server.post("/webhook").text("{not json").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn webhook_missing_metadata_is_acknowledged() {
        let builder = TestAppStateBuilder::new();
        let ledger_repo = builder.ledger_repo();
        let event_repo = builder.event_repo();
        let server = TestServer::new(build_test_router(builder.build())).unwrap();

        let mut payload = webhook_payload("payment.succeeded", "pay-2", Uuid::new_v4());
        payload["object"].as_object_mut().unwrap().remove("metadata");

        let response = server.post("/webhook").json(&payload).await;

        response.assert_status_ok();
        assert_eq!(ledger_repo.subscription_count(), 0);
        let events = event_repo.all();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, PaymentEventOutcome::Rejected);
    }

    #[tokio::test]
    async fn webhook_ledger_failure_asks_for_redelivery() {
        let builder = TestAppStateBuilder::new();
        let ledger_repo = builder.ledger_repo();
        let server = TestServer::new(build_test_router(builder.build())).unwrap();
        ledger_repo.set_fail_writes(true);

        let payload = webhook_payload("payment.succeeded", "pay-3", Uuid::new_v4());
        let response = server.post("/webhook").json(&payload).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        ledger_repo.set_fail_writes(false);
        server.post("/webhook").json(&payload).await.assert_status_ok();
        assert_eq!(ledger_repo.subscription_count(), 1);
    }

    #[tokio::test]
    async fn webhook_unconfirmed_payment_grants_nothing() {
        let builder = TestAppStateBuilder::new().with_webhook_confirmation();
        let ledger_repo = builder.ledger_repo();
        let gateway = builder.gateway();
        let server = TestServer::new(build_test_router(builder.build())).unwrap();

        let user_id = Uuid::new_v4();
        gateway.insert(create_test_gateway_payment("pay-4", user_id, |p| p.paid = false));

        let response = server
            .post("/webhook")
            .json(&webhook_payload("payment.succeeded", "pay-4", user_id))
            .await;

        response.assert_status_ok();
        assert_eq!(ledger_repo.subscription_count(), 0);
    }

    // =========================================================================
    // POST /upgrade
    // =========================================================================

    #[tokio::test]
    async fn upgrade_requires_authentication() {
        let server = TestServer::new(build_test_router(TestAppStateBuilder::new().build())).unwrap();

        let response = server
            .post("/upgrade")
            .json(&serde_json::json!({ "period": "MONTHLY" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upgrade_activates_pro_for_caller() {
        let builder = TestAppStateBuilder::new();
        let ledger_repo = builder.ledger_repo();
        let server = TestServer::new(build_test_router(builder.build())).unwrap();
        let user_id = Uuid::new_v4();

        let response = server
            .post("/upgrade")
            .add_cookie(Cookie::new("access_token", issue_test_token(user_id)))
            .json(&serde_json::json!({ "period": "YEARLY" }))
            .await;

        response.assert_status_ok();
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["plan"], "PRO");
        assert_eq!(body["planExpiresAt"], "2025-06-01T12:00:00Z");
        assert_eq!(body["subscription"]["manuallyGranted"], true);
        assert_eq!(body["subscription"]["grantedBy"], user_id.to_string());
        assert_eq!(ledger_repo.subscription_count(), 1);
    }

    #[tokio::test]
    async fn upgrade_rejects_unknown_period() {
        let server = TestServer::new(build_test_router(TestAppStateBuilder::new().build())).unwrap();

        let response = server
            .post("/upgrade")
            .add_header("Authorization", format!("Bearer {}", issue_test_token(Uuid::new_v4())))
            .json(&serde_json::json!({ "period": "WEEKLY" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    // =========================================================================
    // Payments
    // =========================================================================

    #[tokio::test]
    async fn create_payment_returns_confirmation_url() {
        let builder = TestAppStateBuilder::new();
        let gateway = builder.gateway();
        let server = TestServer::new(build_test_router(builder.build())).unwrap();
        let user_id = Uuid::new_v4();

        let response = server
            .post("/payments")
            .add_cookie(Cookie::new("access_token", issue_test_token(user_id)))
            .json(&serde_json::json!({ "period": "MONTHLY" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<serde_json::Value>();
        assert!(body["confirmationUrl"].as_str().unwrap().starts_with("https://"));
        assert_eq!(body["amount"]["value"], "299.00");
        assert_eq!(gateway.created_requests()[0].metadata.user_id, user_id);
    }

    #[tokio::test]
    async fn payment_status_hides_other_users_payments() {
        let builder = TestAppStateBuilder::new();
        let gateway = builder.gateway();
        let server = TestServer::new(build_test_router(builder.build())).unwrap();

        let owner = Uuid::new_v4();
        gateway.insert(create_test_gateway_payment("pay-5", owner, |_| {}));

        server
            .get("/payments/pay-5")
            .add_cookie(Cookie::new("access_token", issue_test_token(owner)))
            .await
            .assert_status_ok();

        server
            .get("/payments/pay-5")
            .add_cookie(Cookie::new("access_token", issue_test_token(Uuid::new_v4())))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
