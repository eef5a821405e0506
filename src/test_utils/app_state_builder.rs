//! Test app state builder for HTTP-level testing.
//!
//! `TestAppStateBuilder` wires every use case against in-memory repos and a
//! stub gateway. The builder keeps handles to those doubles so tests can
//! seed and inspect them.

use std::{collections::HashSet, net::SocketAddr, sync::Arc};

use axum::http::HeaderValue;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use time::Duration;
use url::Url;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt,
        ports::payment_gateway::PaymentGatewayPort,
        use_cases::{
            checkout::CheckoutUseCases, entitlements::EntitlementsUseCases,
            manual_activation::ManualActivationUseCases, payment_webhook::PaymentWebhookUseCases,
            subscription_ledger::SubscriptionLedgerUseCases,
        },
    },
    infra::config::{AppConfig, GatewayConfig},
    test_utils::{
        FixedClock, InMemoryPaymentEventRepo, InMemorySubscriptionLedgerRepo, StubPaymentGateway,
        test_pricing, utc,
    },
};

pub const TEST_JWT_SECRET: &str = "test_jwt_secret";

/// Sign an access token the way the auth service would.
pub fn issue_test_token(user_id: Uuid) -> String {
    jwt::issue(
        user_id,
        &SecretString::new(TEST_JWT_SECRET.into()),
        Duration::hours(1),
    )
    .unwrap()
}

/// Builder for creating `AppState` with in-memory mocks.
///
/// ```ignore
/// let builder = TestAppStateBuilder::new().with_support_user(admin_id);
/// let ledger_repo = builder.ledger_repo();
/// let app_state = builder.build();
/// ```
pub struct TestAppStateBuilder {
    now: DateTime<Utc>,
    support_user_ids: HashSet<Uuid>,
    confirm_webhooks: bool,
    ledger_repo: Arc<InMemorySubscriptionLedgerRepo>,
    event_repo: Arc<InMemoryPaymentEventRepo>,
    gateway: Arc<StubPaymentGateway>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            now: utc(2024, 6, 1),
            support_user_ids: HashSet::new(),
            confirm_webhooks: false,
            ledger_repo: Arc::new(InMemorySubscriptionLedgerRepo::new()),
            event_repo: Arc::new(InMemoryPaymentEventRepo::new()),
            gateway: Arc::new(StubPaymentGateway::new()),
        }
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_support_user(mut self, user_id: Uuid) -> Self {
        self.support_user_ids.insert(user_id);
        self
    }

    /// Re-fetch succeeded payments from the stub gateway before granting.
    pub fn with_webhook_confirmation(mut self) -> Self {
        self.confirm_webhooks = true;
        self
    }

    /// Share a ledger repo with another state, e.g. to read the same rows
    /// under a different clock.
    pub fn with_ledger_repo(mut self, repo: Arc<InMemorySubscriptionLedgerRepo>) -> Self {
        self.ledger_repo = repo;
        self
    }

    pub fn ledger_repo(&self) -> Arc<InMemorySubscriptionLedgerRepo> {
        self.ledger_repo.clone()
    }

    pub fn event_repo(&self) -> Arc<InMemoryPaymentEventRepo> {
        self.event_repo.clone()
    }

    pub fn gateway(&self) -> Arc<StubPaymentGateway> {
        self.gateway.clone()
    }

    pub fn build(self) -> AppState {
        let config = AppConfig {
            jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
            access_token_ttl: Duration::hours(24),
            app_origin: Url::parse("http://localhost:3000").unwrap(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            database_url: String::new(),
            gateway: GatewayConfig {
                api_base: Url::parse("https://gateway.test/v3/").unwrap(),
                shop_id: "shop-test".to_string(),
                secret_key: SecretString::new("gateway_secret".into()),
                confirm_webhooks: self.confirm_webhooks,
            },
            pricing: test_pricing(),
            support_user_ids: self.support_user_ids,
        };

        let gateway: Arc<dyn PaymentGatewayPort> = self.gateway;
        let ledger = Arc::new(SubscriptionLedgerUseCases::new(
            self.ledger_repo,
            Arc::new(FixedClock(self.now)),
        ));
        let webhook = PaymentWebhookUseCases::new(
            ledger.clone(),
            self.event_repo,
            config.gateway.confirm_webhooks.then(|| gateway.clone()),
        );
        let manual_activation = ManualActivationUseCases::new(ledger.clone(), config.pricing.clone());
        let checkout = CheckoutUseCases::new(gateway, config.pricing.clone(), config.payment_return_url());
        let entitlements = EntitlementsUseCases::new(ledger.clone());

        AppState {
            config: Arc::new(config),
            ledger,
            webhook: Arc::new(webhook),
            manual_activation: Arc::new(manual_activation),
            checkout: Arc::new(checkout),
            entitlements: Arc::new(entitlements),
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
