use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{
        CreatePaymentRequest, GatewayPayment, PaymentGatewayPort, PaymentResult,
    },
    domain::entities::{
        money::Money, payment_notification::PaymentMetadata, payment_status::GatewayPaymentStatus,
    },
};

/// REST client for the hosted-checkout payment gateway.
#[derive(Clone)]
pub struct PaymentGatewayClient {
    client: Client,
    api_base: Url,
    shop_id: String,
    secret_key: SecretString,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct CreatePaymentBody<'a> {
    amount: &'a Money,
    capture: bool,
    confirmation: ConfirmationRequest<'a>,
    description: &'a str,
    metadata: &'a PaymentMetadata,
}

#[derive(Serialize)]
struct ConfirmationRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    return_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct PaymentWire {
    id: String,
    status: String,
    #[serde(default)]
    paid: bool,
    amount: Money,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    confirmation: Option<ConfirmationWire>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ConfirmationWire {
    #[serde(default)]
    confirmation_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorWire {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl PaymentWire {
    fn into_gateway_payment(self) -> GatewayPayment {
        // Payments created elsewhere (or by hand in the dashboard) may carry
        // foreign metadata; treat it as absent rather than failing.
        let metadata = self
            .metadata
            .and_then(|m| serde_json::from_value::<PaymentMetadata>(m).ok());
        GatewayPayment {
            status: GatewayPaymentStatus::from_gateway(&self.status),
            id: self.id,
            paid: self.paid,
            amount: self.amount,
            metadata,
        }
    }
}

impl PaymentGatewayClient {
    pub fn new(client: Client, mut api_base: Url, shop_id: String, secret_key: SecretString) -> Self {
        // Url::join replaces the last segment unless the base ends with '/'.
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }
        Self {
            client,
            api_base,
            shop_id,
            secret_key,
        }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            self.shop_id,
            self.secret_key.expose_secret()
        ));
        format!("Basic {}", encoded)
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        self.api_base
            .join(path)
            .map_err(|e| AppError::Internal(format!("Invalid gateway URL for {path}: {e}")))
    }

    async fn handle_response(&self, response: reqwest::Response) -> AppResult<PaymentWire> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Payment gateway API error");

            if status.is_client_error() && !is_transient_client_error(status) {
                let detail = serde_json::from_str::<GatewayErrorWire>(&body)
                    .ok()
                    .and_then(|e| e.description.or(e.code))
                    .unwrap_or_else(|| status.to_string());
                return Err(AppError::InvalidInput(format!(
                    "Payment gateway rejected request: {}",
                    detail
                )));
            }

            return Err(AppError::PaymentGateway(format!(
                "Payment gateway error: {}",
                status
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse payment gateway response");
            AppError::PaymentGateway(format!("Failed to parse gateway response: {}", e))
        })
    }
}

/// 4xx responses that say nothing about the request itself: timeouts, rate
/// limiting and credential trouble. These must stay retryable so a webhook
/// confirmation is redelivered instead of dropped.
fn is_transient_client_error(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
    )
}

#[async_trait]
impl PaymentGatewayPort for PaymentGatewayClient {
    async fn create_payment(&self, request: CreatePaymentRequest) -> AppResult<PaymentResult> {
        let body = CreatePaymentBody {
            amount: &request.amount,
            capture: true,
            confirmation: ConfirmationRequest {
                kind: "redirect",
                return_url: &request.return_url,
            },
            description: &request.description,
            metadata: &request.metadata,
        };

        let response = self
            .client
            .post(self.endpoint("payments")?)
            .header("Authorization", self.auth_header())
            .header("Idempotence-Key", Uuid::new_v4().to_string())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("Gateway request failed: {}", e)))?;

        let payment = self.handle_response(response).await?;
        let confirmation_url = payment
            .confirmation
            .and_then(|c| c.confirmation_url)
            .ok_or_else(|| {
                AppError::PaymentGateway("Gateway response has no confirmation URL".into())
            })?;

        Ok(PaymentResult {
            payment_id: payment.id,
            confirmation_url,
            amount: payment.amount,
            description: payment.description.unwrap_or(request.description),
        })
    }

    async fn get_payment(&self, payment_id: &str) -> AppResult<Option<GatewayPayment>> {
        let response = self
            .client
            .get(self.endpoint(&format!("payments/{payment_id}"))?)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("Gateway request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let payment = self.handle_response(response).await?;
        Ok(Some(payment.into_gateway_payment()))
    }
}
