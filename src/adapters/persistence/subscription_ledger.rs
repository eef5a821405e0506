use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription_ledger::{
        LedgerWrite, NewSubscription, PlanState, SubscriptionLedgerRepo, SubscriptionProfile,
    },
    domain::entities::subscription::SubscriptionStatus,
};

fn row_to_profile(row: &sqlx::postgres::PgRow) -> SubscriptionProfile {
    SubscriptionProfile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        plan: row.get("plan"),
        status: row.get("status"),
        amount_minor: row.get("amount_minor"),
        currency: row.get("currency"),
        period: row.get("period"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        payment_ref: row.get("payment_ref"),
        manually_granted: row.get("manually_granted"),
        granted_by: row.get("granted_by"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, plan, status, amount_minor, currency, period,
    start_date, end_date, payment_ref, manually_granted, granted_by, created_at
"#;

#[async_trait]
impl SubscriptionLedgerRepo for PostgresPersistence {
    async fn record_activation(&self, input: &NewSubscription) -> AppResult<LedgerWrite> {
        let mut tx = self.pool.begin().await?;

        // A concurrent insert of the same payment_ref blocks here until the
        // other transaction finishes, then falls through to DO NOTHING.
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (
                id, user_id, plan, status, amount_minor, currency, period,
                start_date, end_date, payment_ref, manually_granted, granted_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (payment_ref) DO NOTHING
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.plan)
        .bind(SubscriptionStatus::Active)
        .bind(input.amount.amount_minor)
        .bind(&input.amount.currency)
        .bind(input.period)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.payment_ref.as_deref())
        .bind(input.manually_granted)
        .bind(input.granted_by)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = inserted else {
            tx.rollback().await?;
            let payment_ref = input.payment_ref.as_deref().ok_or_else(|| {
                AppError::Internal("Insert without payment_ref reported a conflict".into())
            })?;
            let existing = self
                .get_by_payment_ref(payment_ref)
                .await?
                .ok_or_else(|| {
                    AppError::Database(format!(
                        "Conflicting subscription for payment {payment_ref} vanished"
                    ))
                })?;
            return Ok(LedgerWrite::AlreadyApplied(existing));
        };

        // Unconditional overwrite: the most recent activation decides expiry.
        sqlx::query(
            r#"
            INSERT INTO users (id, plan, plan_expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET plan = EXCLUDED.plan,
                plan_expires_at = EXCLUDED.plan_expires_at,
                updated_at = NOW()
            "#,
        )
        .bind(input.user_id)
        .bind(input.plan)
        .bind(input.end_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(LedgerWrite::Inserted(row_to_profile(&row)))
    }

    async fn get_plan_state(&self, user_id: Uuid) -> AppResult<Option<PlanState>> {
        let row = sqlx::query("SELECT id, plan, plan_expires_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.map(|r| PlanState {
            user_id: r.get("id"),
            plan: r.get("plan"),
            plan_expires_at: r.get("plan_expires_at"),
        }))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn get_by_payment_ref(
        &self,
        payment_ref: &str,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE payment_ref = $1",
            SELECT_COLS
        ))
        .bind(payment_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<SubscriptionProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC, start_date DESC",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_profile).collect())
    }

    async fn mark_canceled(&self, id: Uuid) -> AppResult<SubscriptionProfile> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE subscriptions
            SET status = $2, canceled_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(SubscriptionStatus::Canceled)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.as_ref().map(row_to_profile).ok_or(AppError::NotFound)
    }
}
