//! Client for this service's own billing API, used by reconciliation when it
//! runs outside the server process (CLI tools, other services).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        reconciliation::{ManualActivator, PlanStateSource},
        subscription_ledger::PlanState,
    },
    domain::entities::{billing_period::BillingPeriod, plan::Plan},
};

#[derive(Clone)]
pub struct BillingApiClient {
    client: Client,
    base_url: Url,
    access_token: SecretString,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanWire {
    plan: Plan,
    plan_expires_at: Option<DateTime<Utc>>,
}

/// `GET /api/user/me`
#[derive(Debug, Deserialize)]
struct MeWire {
    id: Uuid,
    #[serde(flatten)]
    plan: PlanWire,
}

/// `POST /api/billing/upgrade`
#[derive(Debug, Deserialize)]
struct UpgradeWire {
    subscription: SubscriptionOwnerWire,
    #[serde(flatten)]
    plan: PlanWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionOwnerWire {
    user_id: Uuid,
}

impl PlanWire {
    fn into_state(self, user_id: Uuid) -> PlanState {
        PlanState {
            user_id,
            plan: self.plan,
            plan_expires_at: self.plan_expires_at,
        }
    }
}

/// The API acts for whoever owns the access token, so a token for another
/// account would silently report or activate the wrong user.
fn ensure_same_user(expected: Uuid, actual: Uuid) -> AppResult<()> {
    if expected != actual {
        tracing::error!(
            expected = %expected,
            actual = %actual,
            "Billing API token belongs to a different user"
        );
        return Err(AppError::Forbidden);
    }
    Ok(())
}

#[derive(Serialize)]
struct UpgradeBody {
    period: BillingPeriod,
}

impl BillingApiClient {
    pub fn new(client: Client, base_url: Url, access_token: SecretString) -> Self {
        Self {
            client,
            base_url,
            access_token,
        }
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Internal(format!("Invalid billing API URL for {path}: {e}")))
    }

    async fn read_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> AppResult<T> {
        match response.status() {
            s if s.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| AppError::Internal(format!("Failed to parse billing API response: {e}"))),
            StatusCode::UNAUTHORIZED => Err(AppError::InvalidCredentials),
            StatusCode::FORBIDDEN => Err(AppError::Forbidden),
            StatusCode::NOT_FOUND => Err(AppError::NotFound),
            s => {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(status = %s, body = %body, "Billing API error");
                Err(AppError::Internal(format!("Billing API error: {s}")))
            }
        }
    }
}

#[async_trait]
impl PlanStateSource for BillingApiClient {
    async fn read_plan(&self, user_id: Uuid) -> AppResult<PlanState> {
        let response = self
            .client
            .get(self.endpoint("/api/user/me")?)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Billing API request failed: {e}")))?;

        let me: MeWire = self.read_json(response).await?;
        ensure_same_user(user_id, me.id)?;
        Ok(me.plan.into_state(user_id))
    }
}

#[async_trait]
impl ManualActivator for BillingApiClient {
    async fn activate_manually(&self, user_id: Uuid, period: BillingPeriod) -> AppResult<PlanState> {
        let response = self
            .client
            .post(self.endpoint("/api/billing/upgrade")?)
            .bearer_auth(self.access_token.expose_secret())
            .json(&UpgradeBody { period })
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Billing API request failed: {e}")))?;

        let upgrade: UpgradeWire = self.read_json(response).await?;
        ensure_same_user(user_id, upgrade.subscription.user_id)?;
        Ok(upgrade.plan.into_state(user_id))
    }
}
