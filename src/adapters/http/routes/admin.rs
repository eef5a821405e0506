//! Support tooling. Every route requires a caller listed in `SUPPORT_USER_IDS`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::{
        app_state::AppState,
        auth::{current_actor, require_support},
    },
    app_error::AppResult,
    domain::entities::billing_period::BillingPeriod,
    use_cases::{payment_webhook::PaymentEventProfile, subscription_ledger::SubscriptionProfile},
};

#[derive(Deserialize)]
struct PeriodPayload {
    period: BillingPeriod,
}

#[derive(Serialize)]
struct ItemsResponse<T> {
    items: Vec<T>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/{user_id}/upgrade", post(upgrade_user))
        .route("/users/{user_id}/subscriptions", get(user_subscriptions))
        .route("/subscriptions/{id}/cancel", post(cancel_subscription))
        .route("/payments/{payment_id}/events", get(payment_events))
}

async fn upgrade_user(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    cookies: CookieJar,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<PeriodPayload>,
) -> AppResult<impl IntoResponse> {
    let actor = require_support(current_actor(&headers, &cookies, &app_state)?)?;
    let subscription = app_state
        .manual_activation
        .manual_activate(&actor, user_id, payload.period)
        .await?;
    Ok(Json(subscription))
}

async fn user_subscriptions(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    cookies: CookieJar,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_support(current_actor(&headers, &cookies, &app_state)?)?;
    let items: Vec<SubscriptionProfile> = app_state.ledger.list_subscriptions(user_id).await?;
    Ok(Json(ItemsResponse { items }))
}

async fn cancel_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    cookies: CookieJar,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = require_support(current_actor(&headers, &cookies, &app_state)?)?;
    let subscription = app_state.ledger.cancel_subscription(id, &actor).await?;
    Ok(Json(subscription))
}

async fn payment_events(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    cookies: CookieJar,
    Path(payment_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    require_support(current_actor(&headers, &cookies, &app_state)?)?;
    let items: Vec<PaymentEventProfile> =
        app_state.webhook.events_for_payment(&payment_id).await?;
    Ok(Json(ItemsResponse { items }))
}
