use crate::{
    adapters::http::app_state::AppState,
    application::{
        ports::{clock::SystemClock, payment_gateway::PaymentGatewayPort},
        use_cases::{
            checkout::CheckoutUseCases,
            entitlements::EntitlementsUseCases,
            manual_activation::ManualActivationUseCases,
            payment_webhook::{PaymentEventRepo, PaymentWebhookUseCases},
            subscription_ledger::{SubscriptionLedgerRepo, SubscriptionLedgerUseCases},
        },
    },
    infra::{
        config::AppConfig, http_client::try_build_client,
        payment_gateway_client::PaymentGatewayClient, postgres_persistence,
    },
};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let gateway: Arc<dyn PaymentGatewayPort> = Arc::new(PaymentGatewayClient::new(
        try_build_client()?,
        config.gateway.api_base.clone(),
        config.gateway.shop_id.clone(),
        config.gateway.secret_key.clone(),
    ));

    let ledger = Arc::new(SubscriptionLedgerUseCases::new(
        postgres_arc.clone() as Arc<dyn SubscriptionLedgerRepo>,
        Arc::new(SystemClock),
    ));

    let webhook = PaymentWebhookUseCases::new(
        ledger.clone(),
        postgres_arc.clone() as Arc<dyn PaymentEventRepo>,
        config.gateway.confirm_webhooks.then(|| gateway.clone()),
    );
    if !config.gateway.confirm_webhooks {
        tracing::warn!("GATEWAY_CONFIRM_WEBHOOKS is off; payment notifications are trusted as sent");
    }

    let manual_activation = ManualActivationUseCases::new(ledger.clone(), config.pricing.clone());
    let checkout = CheckoutUseCases::new(
        gateway,
        config.pricing.clone(),
        config.payment_return_url(),
    );
    let entitlements = EntitlementsUseCases::new(ledger.clone());

    Ok(AppState {
        config: Arc::new(config),
        ledger,
        webhook: Arc::new(webhook),
        manual_activation: Arc::new(manual_activation),
        checkout: Arc::new(checkout),
        entitlements: Arc::new(entitlements),
    })
}

/// `LOG_FORMAT=json` switches from pretty console output to one JSON object
/// per line.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "prizewheel_api=debug,tower_http=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let (console_layer, json_layer) = if json {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true);
        (None, Some(layer))
    } else {
        let layer = fmt::layer()
            .with_target(false) // don’t show target (module path)
            .with_level(true)
            .pretty();
        (Some(layer), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
