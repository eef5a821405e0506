use std::{collections::HashSet, net::SocketAddr};

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use time::Duration;
use url::Url;
use uuid::Uuid;

use crate::{
    application::use_cases::manual_activation::PlanPricing, domain::entities::money::Money,
};

pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub access_token_ttl: Duration,
    /// Frontend origin; the gateway sends buyers back to `{app_origin}/billing/return`.
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub gateway: GatewayConfig,
    pub pricing: PlanPricing,
    /// Users allowed to activate or cancel subscriptions for others.
    pub support_user_ids: HashSet<Uuid>,
}

pub struct GatewayConfig {
    pub api_base: Url,
    pub shop_id: String,
    pub secret_key: SecretString,
    /// Re-fetch each `payment.succeeded` from the gateway before granting PRO.
    pub confirm_webhooks: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let access_token_ttl_secs: i64 = get_env_default("ACCESS_TOKEN_TTL_SECS", 86_400);

        let app_origin: Url = get_env("APP_ORIGIN");
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let bind_addr: SocketAddr =
            get_env_default("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3001)));
        let database_url: String = get_env("DATABASE_URL");

        let gateway = GatewayConfig {
            api_base: get_env("GATEWAY_API_BASE"),
            shop_id: get_env("GATEWAY_SHOP_ID"),
            secret_key: SecretString::new(get_env::<String>("GATEWAY_SECRET_KEY").into()),
            confirm_webhooks: get_env_default("GATEWAY_CONFIRM_WEBHOOKS", true),
        };

        let currency: String = get_env_default("PRICE_CURRENCY", "RUB".to_string());
        let monthly: String = get_env_default("PRO_MONTHLY_PRICE", "299.00".to_string());
        let yearly: String = get_env_default("PRO_YEARLY_PRICE", "2990.00".to_string());
        let pricing = PlanPricing {
            monthly: Money::parse(&monthly, &currency)
                .expect("PRO_MONTHLY_PRICE/PRICE_CURRENCY must form a valid amount"),
            yearly: Money::parse(&yearly, &currency)
                .expect("PRO_YEARLY_PRICE/PRICE_CURRENCY must form a valid amount"),
        };

        let support_user_ids =
            parse_support_user_ids(&get_env_default("SUPPORT_USER_IDS", String::new()))
                .expect("SUPPORT_USER_IDS must be a comma-separated list of UUIDs");

        Self {
            jwt_secret,
            access_token_ttl: Duration::seconds(access_token_ttl_secs),
            app_origin,
            cors_origin,
            bind_addr,
            database_url,
            gateway,
            pricing,
            support_user_ids,
        }
    }

    pub fn payment_return_url(&self) -> String {
        self.app_origin
            .join("billing/return")
            .map(String::from)
            .unwrap_or_else(|_| self.app_origin.to_string())
    }
}

fn parse_support_user_ids(raw: &str) -> Result<HashSet<Uuid>, uuid::Error> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Uuid::parse_str)
        .collect()
}
