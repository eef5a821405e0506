use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::payment_webhook::{
        NewPaymentEvent, PaymentEventProfile, PaymentEventRepo,
    },
};

fn row_to_profile(row: &sqlx::postgres::PgRow) -> PaymentEventProfile {
    PaymentEventProfile {
        id: row.get("id"),
        payment_id: row.get("payment_id"),
        event: row.get("event"),
        outcome: row.get("outcome"),
        user_id: row.get("user_id"),
        reason: row.get("reason"),
        payload: row.get("payload"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = "id, payment_id, event, outcome, user_id, reason, payload, created_at";

#[async_trait]
impl PaymentEventRepo for PostgresPersistence {
    async fn record(&self, input: &NewPaymentEvent) -> AppResult<PaymentEventProfile> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payment_events (id, payment_id, event, outcome, user_id, reason, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(input.payment_id.as_deref())
        .bind(&input.event)
        .bind(input.outcome)
        .bind(input.user_id)
        .bind(input.reason.as_deref())
        .bind(&input.payload)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(&row))
    }

    async fn list_by_payment(&self, payment_id: &str) -> AppResult<Vec<PaymentEventProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM payment_events WHERE payment_id = $1 ORDER BY created_at ASC",
            SELECT_COLS
        ))
        .bind(payment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_profile).collect())
    }
}
