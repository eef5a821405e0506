use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, auth::current_actor},
    app_error::AppResult,
    domain::entities::plan::Plan,
    use_cases::subscription_ledger::SubscriptionProfile,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    id: Uuid,
    plan: Plan,
    plan_expires_at: Option<DateTime<Utc>>,
    /// The stored expiry is in the past. The plan itself is not downgraded.
    plan_expired: bool,
}

#[derive(Serialize)]
struct SubscriptionsResponse {
    items: Vec<SubscriptionProfile>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/plan-limits", get(plan_limits))
        .route("/subscriptions", get(subscriptions))
}

async fn me(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    cookies: CookieJar,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers, &cookies, &app_state)?;
    let state = app_state.ledger.current_plan(actor.user_id).await?;

    Ok(Json(MeResponse {
        id: actor.user_id,
        plan: state.plan,
        plan_expired: state.is_expired(app_state.ledger.now()),
        plan_expires_at: state.plan_expires_at,
    }))
}

async fn plan_limits(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    cookies: CookieJar,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers, &cookies, &app_state)?;
    let limits = app_state.entitlements.limits_for(actor.user_id).await?;
    Ok(Json(limits))
}

async fn subscriptions(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    cookies: CookieJar,
) -> AppResult<impl IntoResponse> {
    let actor = current_actor(&headers, &cookies, &app_state)?;
    let items = app_state.ledger.list_subscriptions(actor.user_id).await?;
    Ok(Json(SubscriptionsResponse { items }))
}
