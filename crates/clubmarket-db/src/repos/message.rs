//! Negotiation message repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, DbMessage, DbResult};

pub struct MessageRepo {
    pool: PgPool,
}

impl MessageRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, msg: &DbMessage) -> DbResult<DbMessage> {
        let m = sqlx::query_as::<_, DbMessage>(
            r#"
            INSERT INTO marketplace_messages (id, item_id, sender_id, recipient_id, message_type,
                content, offer_amount, status, original_offer_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(msg.id)
        .bind(msg.item_id)
        .bind(msg.sender_id)
        .bind(msg.recipient_id)
        .bind(&msg.message_type)
        .bind(&msg.content)
        .bind(msg.offer_amount)
        .bind(&msg.status)
        .bind(msg.original_offer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(m)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbMessage>> {
        let msg = sqlx::query_as::<_, DbMessage>("SELECT * FROM marketplace_messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(msg)
    }

    /// Full message thread between two users for one listing, oldest first.
    /// Unpaginated; negotiation threads stay short in practice.
    pub async fn conversation(&self, item_id: Uuid, a: Uuid, b: Uuid) -> DbResult<Vec<DbMessage>> {
        let msgs = sqlx::query_as::<_, DbMessage>(
            r#"
            SELECT * FROM marketplace_messages
            WHERE item_id = $1
              AND ((sender_id = $2 AND recipient_id = $3) OR (sender_id = $3 AND recipient_id = $2))
            ORDER BY created_at ASC
            "#,
        )
        .bind(item_id)
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await?;
        Ok(msgs)
    }

    /// Pending offers and counter-offers on a listing.
    pub async fn active_offers(&self, item_id: Uuid) -> DbResult<Vec<DbMessage>> {
        let msgs = sqlx::query_as::<_, DbMessage>(
            r#"
            SELECT * FROM marketplace_messages
            WHERE item_id = $1 AND status = 'pending' AND message_type IN ('offer', 'counter_offer')
            ORDER BY created_at ASC
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(msgs)
    }

    /// Recipient marks a single message read.
    pub async fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> DbResult<DbMessage> {
        let msg = sqlx::query_as::<_, DbMessage>(
            r#"
            UPDATE marketplace_messages
            SET read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND recipient_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound("Message not found".to_string()))?;
        Ok(msg)
    }

    pub async fn inbox(&self, user_id: Uuid, limit: i64, offset: i64) -> DbResult<Vec<DbMessage>> {
        let msgs = sqlx::query_as::<_, DbMessage>(
            r#"
            SELECT * FROM marketplace_messages
            WHERE recipient_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(msgs)
    }

    pub async fn count_unread(&self, user_id: Uuid) -> DbResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM marketplace_messages WHERE recipient_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn mark_conversation_read(&self, item_id: Uuid, user_id: Uuid) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE marketplace_messages
            SET read_at = NOW()
            WHERE item_id = $1 AND recipient_id = $2 AND read_at IS NULL
            "#,
        )
        .bind(item_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Accept one pending offer and reject every sibling offer on the same
    /// listing in the same transaction. The conditional update means a second
    /// accept (or a concurrent reject) of the same offer affects zero rows
    /// and surfaces as `InvalidState` instead of a double resolution.
    ///
    /// Returns the accepted message and the number of sibling offers swept.
    pub async fn accept(&self, id: Uuid) -> DbResult<(DbMessage, u64)> {
        let mut tx = self.pool.begin().await?;

        let msg = sqlx::query_as::<_, DbMessage>(
            r#"
            UPDATE marketplace_messages
            SET status = 'accepted', is_active = FALSE
            WHERE id = $1 AND status = 'pending' AND message_type IN ('offer', 'counter_offer')
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::InvalidState("Offer is no longer pending".to_string()))?;

        let swept = sqlx::query(
            r#"
            UPDATE marketplace_messages
            SET status = 'rejected', is_active = FALSE
            WHERE item_id = $1 AND id <> $2
              AND status = 'pending' AND message_type IN ('offer', 'counter_offer')
            "#,
        )
        .bind(msg.item_id)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok((msg, swept))
    }

    pub async fn reject(&self, id: Uuid) -> DbResult<DbMessage> {
        let msg = sqlx::query_as::<_, DbMessage>(
            r#"
            UPDATE marketplace_messages
            SET status = 'rejected', is_active = FALSE
            WHERE id = $1 AND status = 'pending' AND message_type IN ('offer', 'counter_offer')
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::InvalidState("Offer is no longer pending".to_string()))?;
        Ok(msg)
    }

    pub async fn withdraw(&self, id: Uuid) -> DbResult<DbMessage> {
        let msg = sqlx::query_as::<_, DbMessage>(
            r#"
            UPDATE marketplace_messages
            SET status = 'withdrawn', is_active = FALSE
            WHERE id = $1 AND status = 'pending' AND message_type IN ('offer', 'counter_offer')
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::InvalidState("Offer is no longer pending".to_string()))?;
        Ok(msg)
    }

    /// Expire pending offers on a listing that left the catalogue. Called
    /// from the expiry sweep, never from a request path.
    pub async fn expire_pending_for_item(&self, item_id: Uuid) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE marketplace_messages
            SET status = 'expired', is_active = FALSE
            WHERE item_id = $1 AND status = 'pending' AND message_type IN ('offer', 'counter_offer')
            "#,
        )
        .bind(item_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Buyer confirms the item arrived, completing the transaction.
    pub async fn mark_received(&self, id: Uuid) -> DbResult<DbMessage> {
        let msg = sqlx::query_as::<_, DbMessage>(
            r#"
            UPDATE marketplace_messages
            SET marked_received_at = NOW(), completed_transaction = TRUE
            WHERE id = $1 AND status = 'accepted' AND marked_received_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::InvalidState("Offer is not accepted or already confirmed".to_string()))?;
        Ok(msg)
    }

    /// Accepted offer for a listing, if any. Used to verify a rating is tied
    /// to a real transaction.
    pub async fn accepted_offer_for_item(&self, item_id: Uuid) -> DbResult<Option<DbMessage>> {
        let msg = sqlx::query_as::<_, DbMessage>(
            r#"
            SELECT * FROM marketplace_messages
            WHERE item_id = $1 AND status = 'accepted' AND message_type IN ('offer', 'counter_offer')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(msg)
    }
}
