//! Reputation repository
//!
//! Ratings are append-only, one per (rated user, reviewer, listing). Running
//! totals are maintained in `user_rating_totals` in the same transaction as
//! the insert so averages never require a full scan.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{DbBuyerRating, DbError, DbRatingTotals, DbResult, DbSellerRating};

pub struct RatingRepo {
    pool: PgPool,
}

impl RatingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Buyer rates the seller after a completed transaction. Inserts the
    /// rating, bumps the seller's running totals and the listing's counters,
    /// and marks the transaction as buyer-rated, all atomically. A duplicate
    /// rating surfaces as `Conflict`.
    pub async fn create_seller_rating(
        &self,
        rating: &DbSellerRating,
        message_id: Uuid,
    ) -> DbResult<DbSellerRating> {
        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, DbSellerRating>(
            r#"
            INSERT INTO seller_ratings (id, seller_id, reviewer_id, item_id, rating, comment, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(rating.id)
        .bind(rating.seller_id)
        .bind(rating.reviewer_id)
        .bind(rating.item_id)
        .bind(rating.rating)
        .bind(&rating.comment)
        .bind(&rating.status)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::on_insert(e, "You have already rated this seller for this listing"))?;

        Self::bump_totals(&mut tx, rating.seller_id, rating.rating as i64, 1).await?;

        sqlx::query(
            "UPDATE listings SET rating_sum = rating_sum + $2, rating_count = rating_count + 1 WHERE id = $1",
        )
        .bind(rating.item_id)
        .bind(rating.rating as i64)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE marketplace_messages SET buyer_rated = TRUE WHERE id = $1")
            .bind(message_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(saved)
    }

    /// Seller rates the buyer after a completed transaction.
    pub async fn create_buyer_rating(
        &self,
        rating: &DbBuyerRating,
        message_id: Uuid,
    ) -> DbResult<DbBuyerRating> {
        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, DbBuyerRating>(
            r#"
            INSERT INTO buyer_ratings (id, buyer_id, reviewer_id, item_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(rating.id)
        .bind(rating.buyer_id)
        .bind(rating.reviewer_id)
        .bind(rating.item_id)
        .bind(rating.rating)
        .bind(&rating.comment)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::on_insert(e, "You have already rated this buyer for this listing"))?;

        Self::bump_totals(&mut tx, rating.buyer_id, rating.rating as i64, 1).await?;

        sqlx::query("UPDATE marketplace_messages SET seller_rated = TRUE WHERE id = $1")
            .bind(message_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn bump_totals(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        sum_delta: i64,
        count_delta: i64,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_rating_totals (user_id, rating_sum, rating_count)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET rating_sum = user_rating_totals.rating_sum + $2,
                rating_count = user_rating_totals.rating_count + $3,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(sum_delta)
        .bind(count_delta)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn seller_ratings(&self, seller_id: Uuid, limit: i64, offset: i64) -> DbResult<Vec<DbSellerRating>> {
        let ratings = sqlx::query_as::<_, DbSellerRating>(
            r#"
            SELECT * FROM seller_ratings
            WHERE seller_id = $1 AND status IN ('pending', 'approved')
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(seller_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    pub async fn buyer_ratings(&self, buyer_id: Uuid, limit: i64, offset: i64) -> DbResult<Vec<DbBuyerRating>> {
        let ratings = sqlx::query_as::<_, DbBuyerRating>(
            "SELECT * FROM buyer_ratings WHERE buyer_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(buyer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    pub async fn totals_for_user(&self, user_id: Uuid) -> DbResult<Option<DbRatingTotals>> {
        let totals = sqlx::query_as::<_, DbRatingTotals>(
            "SELECT * FROM user_rating_totals WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(totals)
    }

    /// Admin sign-off on a pending seller rating. The totals already include
    /// it, so this is a pure status flip.
    pub async fn approve_seller_rating(&self, id: Uuid) -> DbResult<DbSellerRating> {
        sqlx::query_as::<_, DbSellerRating>(
            "UPDATE seller_ratings SET status = 'approved' WHERE id = $1 AND status = 'pending' RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::InvalidState("Rating not found or not pending".to_string()))
    }

    /// Admin rejection of a seller rating. The rating row is kept for audit;
    /// the running totals and listing counters are corrected in the same
    /// transaction.
    pub async fn reject_seller_rating(&self, id: Uuid) -> DbResult<DbSellerRating> {
        let mut tx = self.pool.begin().await?;

        let rating = sqlx::query_as::<_, DbSellerRating>(
            r#"
            UPDATE seller_ratings SET status = 'rejected'
            WHERE id = $1 AND status IN ('pending', 'approved')
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::InvalidState("Rating not found or already rejected".to_string()))?;

        Self::bump_totals(&mut tx, rating.seller_id, -(rating.rating as i64), -1).await?;

        sqlx::query(
            "UPDATE listings SET rating_sum = rating_sum - $2, rating_count = rating_count - 1 WHERE id = $1",
        )
        .bind(rating.item_id)
        .bind(rating.rating as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(rating)
    }
}
