use crate::{adapters::persistence::PostgresPersistence, infra::db::init_db};

pub mod app;
pub mod billing_api_client;
pub mod config;
pub mod db;
pub mod http_client;
pub mod payment_gateway_client;
pub mod setup;

pub async fn postgres_persistence(database_url: &str) -> anyhow::Result<PostgresPersistence> {
    let pool = init_db(database_url).await?;
    let persistence = PostgresPersistence::new(pool);
    Ok(persistence)
}
