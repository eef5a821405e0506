use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    infra::config::AppConfig,
    use_cases::{
        checkout::CheckoutUseCases, entitlements::EntitlementsUseCases,
        manual_activation::ManualActivationUseCases, payment_webhook::PaymentWebhookUseCases,
        subscription_ledger::SubscriptionLedgerUseCases,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ledger: Arc<SubscriptionLedgerUseCases>,
    pub webhook: Arc<PaymentWebhookUseCases>,
    pub manual_activation: Arc<ManualActivationUseCases>,
    pub checkout: Arc<CheckoutUseCases>,
    pub entitlements: Arc<EntitlementsUseCases>,
}

impl FromRef<AppState> for Arc<SubscriptionLedgerUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ledger.clone()
    }
}

impl FromRef<AppState> for Arc<PaymentWebhookUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.webhook.clone()
    }
}
