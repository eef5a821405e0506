//! Waits for a user's plan to flip to PRO after checkout, the way the
//! payment return page does, and optionally falls back to manual activation.
//!
//! Configured from the environment:
//! `BILLING_API_BASE`, `BILLING_ACCESS_TOKEN`, `RECONCILE_USER_ID`,
//! `RECONCILE_PERIOD` (MONTHLY | YEARLY), `RECONCILE_ACCEPT_MANUAL`.

use std::sync::Arc;

use dotenvy::dotenv;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;
use uuid::Uuid;

use prizewheel_api::{
    application::{
        ports::clock::TokioSleeper,
        use_cases::reconciliation::{ReconciliationPoller, ReconciliationState, cancellation},
    },
    domain::entities::billing_period::BillingPeriod,
    infra::{billing_api_client::BillingApiClient, http_client::try_build_client, setup::init_tracing},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let api_base: Url = get_env("BILLING_API_BASE");
    let access_token = SecretString::new(get_env::<String>("BILLING_ACCESS_TOKEN").into());
    let user_id: Uuid = get_env("RECONCILE_USER_ID");
    let period: BillingPeriod =
        get_env_default("RECONCILE_PERIOD", String::from("MONTHLY")).parse()?;
    let accept_manual: bool = get_env_default("RECONCILE_ACCEPT_MANUAL", false);

    let client = Arc::new(BillingApiClient::new(try_build_client()?, api_base, access_token));
    let poller = ReconciliationPoller::new(client.clone(), Arc::new(TokioSleeper));

    let (handle, token) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let observer = |state: &ReconciliationState| tracing::info!(state = ?state, "Reconciliation");
    let terminal = poller.run(user_id, period, &token, &observer).await;

    match terminal {
        ReconciliationState::ProConfirmed { expires_at } => {
            tracing::info!(expires_at = ?expires_at, "PRO is active");
        }
        ReconciliationState::TimedOutOfferManual(offer) => {
            tracing::warn!(message = %offer.message, "Payment not confirmed yet");
            if accept_manual {
                let state = offer.accept(client.as_ref()).await?;
                tracing::info!(plan = %state.plan, expires_at = ?state.plan_expires_at, "Manual activation done");
            }
        }
        other => tracing::info!(state = ?other, "Reconciliation stopped"),
    }

    Ok(())
}
