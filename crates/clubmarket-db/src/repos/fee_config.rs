//! Fee configuration repository
//!
//! Configurations are versioned, never edited in place. Activating a new
//! version deactivates the previous one in the same transaction; a partial
//! unique index guarantees at most one active row.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, DbFeeConfig, DbResult};

pub struct FeeConfigRepo {
    pool: PgPool,
}

impl FeeConfigRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new version and make it the active one.
    pub async fn create_active(&self, config: &DbFeeConfig) -> DbResult<DbFeeConfig> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE fee_configs SET is_active = FALSE WHERE is_active")
            .execute(&mut *tx)
            .await?;

        let saved = sqlx::query_as::<_, DbFeeConfig>(
            r#"
            INSERT INTO fee_configs (id, posting_fee, extension_fee, featured_fee, premium_fee,
                fee_type, default_expiration_days, extension_days, max_extensions,
                free_posting_limit, free_extension_limit, currency, is_active, effective_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, TRUE, $13, $14)
            RETURNING *
            "#,
        )
        .bind(config.id)
        .bind(config.posting_fee)
        .bind(config.extension_fee)
        .bind(config.featured_fee)
        .bind(config.premium_fee)
        .bind(&config.fee_type)
        .bind(config.default_expiration_days)
        .bind(config.extension_days)
        .bind(config.max_extensions)
        .bind(config.free_posting_limit)
        .bind(config.free_extension_limit)
        .bind(&config.currency)
        .bind(config.effective_date)
        .bind(config.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::on_insert(e, "Another fee configuration is already active"))?;

        tx.commit().await?;
        Ok(saved)
    }

    pub async fn find_active(&self) -> DbResult<Option<DbFeeConfig>> {
        let config = sqlx::query_as::<_, DbFeeConfig>(
            "SELECT * FROM fee_configs WHERE is_active LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(config)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbFeeConfig>> {
        let config = sqlx::query_as::<_, DbFeeConfig>("SELECT * FROM fee_configs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(config)
    }

    /// Version history, newest first.
    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<DbFeeConfig>> {
        let configs = sqlx::query_as::<_, DbFeeConfig>(
            "SELECT * FROM fee_configs ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(configs)
    }
}
