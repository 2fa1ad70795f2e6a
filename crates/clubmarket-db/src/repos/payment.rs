//! Payment ledger repository
//!
//! Payments are append-mostly: an intent row is inserted as `pending` and
//! moves through at most one terminal transition. Refunds keep the original
//! row and add a `refund` row so the ledger stays additive.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, DbPayment, DbResult};

pub struct PaymentRepo {
    pool: PgPool,
}

impl PaymentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, payment: &DbPayment) -> DbResult<DbPayment> {
        let p = sqlx::query_as::<_, DbPayment>(
            r#"
            INSERT INTO marketplace_payments (id, user_id, item_id, amount, currency, payment_type,
                status, payment_method, external_payment_id, fee_config_id, description, metadata,
                processed_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(payment.id)
        .bind(payment.user_id)
        .bind(payment.item_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.payment_type)
        .bind(&payment.status)
        .bind(&payment.payment_method)
        .bind(&payment.external_payment_id)
        .bind(payment.fee_config_id)
        .bind(&payment.description)
        .bind(&payment.metadata)
        .bind(payment.processed_at)
        .bind(payment.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(p)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbPayment>> {
        let payment = sqlx::query_as::<_, DbPayment>("SELECT * FROM marketplace_payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    pub async fn find_by_user(&self, user_id: Uuid, limit: i64, offset: i64) -> DbResult<Vec<DbPayment>> {
        let payments = sqlx::query_as::<_, DbPayment>(
            "SELECT * FROM marketplace_payments WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    pub async fn find_by_item(&self, item_id: Uuid) -> DbResult<Vec<DbPayment>> {
        let payments = sqlx::query_as::<_, DbPayment>(
            "SELECT * FROM marketplace_payments WHERE item_id = $1 ORDER BY created_at DESC",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Settle a pending intent. The expiry window is enforced in the same
    /// statement, so a stale intent cannot complete even if the caller's
    /// clock disagrees.
    pub async fn complete(
        &self,
        id: Uuid,
        external_payment_id: Option<&str>,
        processed_by: Option<Uuid>,
    ) -> DbResult<DbPayment> {
        let payment = sqlx::query_as::<_, DbPayment>(
            r#"
            UPDATE marketplace_payments
            SET status = 'completed', external_payment_id = COALESCE($2, external_payment_id),
                processed_at = NOW(), processed_by = $3
            WHERE id = $1 AND status = 'pending' AND expires_at > NOW()
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(external_payment_id)
        .bind(processed_by)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::InvalidState("Payment is not pending or the intent has expired".to_string()))?;
        Ok(payment)
    }

    pub async fn fail(&self, id: Uuid, reason: &str) -> DbResult<DbPayment> {
        let payment = sqlx::query_as::<_, DbPayment>(
            r#"
            UPDATE marketplace_payments
            SET status = 'failed', description = $2, processed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::InvalidState("Payment is not pending".to_string()))?;
        Ok(payment)
    }

    pub async fn cancel(&self, id: Uuid, user_id: Uuid) -> DbResult<DbPayment> {
        let payment = sqlx::query_as::<_, DbPayment>(
            r#"
            UPDATE marketplace_payments
            SET status = 'cancelled', processed_at = NOW()
            WHERE id = $1 AND user_id = $2 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::InvalidState("Payment not found or not pending".to_string()))?;
        Ok(payment)
    }

    /// Refund a completed payment. The original row is marked refunded and a
    /// compensating `refund` row is written in the same transaction; a second
    /// refund attempt affects zero rows and fails.
    pub async fn refund(
        &self,
        id: Uuid,
        refunded_by: Uuid,
        reason: &str,
        amount: Decimal,
        refund_row: &DbPayment,
    ) -> DbResult<(DbPayment, DbPayment)> {
        let mut tx = self.pool.begin().await?;

        let original = sqlx::query_as::<_, DbPayment>(
            r#"
            UPDATE marketplace_payments
            SET status = 'refunded', refunded_at = NOW(), refunded_by = $2,
                refund_reason = $3, refund_amount = $4
            WHERE id = $1 AND status = 'completed' AND refunded_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(refunded_by)
        .bind(reason)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::InvalidState("Payment is not completed or already refunded".to_string()))?;

        let refund = sqlx::query_as::<_, DbPayment>(
            r#"
            INSERT INTO marketplace_payments (id, user_id, item_id, amount, currency, payment_type,
                status, payment_method, description, metadata, processed_at, processed_by, expires_at)
            VALUES ($1, $2, $3, $4, $5, 'refund', 'completed', $6, $7, $8, NOW(), $9, NOW())
            RETURNING *
            "#,
        )
        .bind(refund_row.id)
        .bind(refund_row.user_id)
        .bind(refund_row.item_id)
        .bind(amount)
        .bind(&refund_row.currency)
        .bind(&refund_row.payment_method)
        .bind(&refund_row.description)
        .bind(&refund_row.metadata)
        .bind(refunded_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((original, refund))
    }

    /// Cancel pending intents that outlived their window.
    pub async fn sweep_expired(&self) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE marketplace_payments SET status = 'cancelled', processed_at = NOW() WHERE status = 'pending' AND expires_at < NOW()",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Completed payments of one type by one user since the given instant.
    /// Used for the monthly free-extension allowance.
    pub async fn count_completed_since(
        &self,
        user_id: Uuid,
        payment_type: &str,
        since: DateTime<Utc>,
    ) -> DbResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM marketplace_payments
            WHERE user_id = $1 AND payment_type = $2 AND status = 'completed' AND created_at >= $3
            "#,
        )
        .bind(user_id)
        .bind(payment_type)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Gross completed fee revenue since the given instant, refunds excluded.
    pub async fn revenue_since(&self, since: DateTime<Utc>) -> DbResult<Decimal> {
        let (total,): (Option<Decimal>,) = sqlx::query_as(
            r#"
            SELECT SUM(amount) FROM marketplace_payments
            WHERE status = 'completed' AND payment_type <> 'refund' AND created_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }
}
