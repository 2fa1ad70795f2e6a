//! Listing repository
//!
//! All status transitions go through conditional `UPDATE ... WHERE status IN
//! (...) RETURNING *` statements so concurrent writers cannot double-apply a
//! transition.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use clubmarket_core::listing as core_listing;
use clubmarket_types::{ListingStatus, FLAG_REVIEW_THRESHOLD};

use crate::{DbError, DbListing, DbListingFlag, DbResult};

/// Search filters for the public catalogue
#[derive(Debug, Clone, Default)]
pub struct ListingSearch {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub condition: Option<String>,
    pub brand: Option<String>,
    pub seller_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub query: Option<String>,
    pub featured_only: bool,
    pub sort: ListingSort,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingSort {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
    Popularity,
    Rating,
}

impl ListingSort {
    fn order_by(self) -> &'static str {
        match self {
            ListingSort::Newest => "created_at DESC",
            ListingSort::Oldest => "created_at ASC",
            ListingSort::PriceAsc => "price ASC",
            ListingSort::PriceDesc => "price DESC",
            ListingSort::Popularity => "views DESC",
            ListingSort::Rating => {
                "CASE WHEN rating_count > 0 THEN rating_sum::float8 / rating_count ELSE 0 END DESC"
            }
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "newest" => Some(ListingSort::Newest),
            "oldest" => Some(ListingSort::Oldest),
            "price_asc" => Some(ListingSort::PriceAsc),
            "price_desc" => Some(ListingSort::PriceDesc),
            "popularity" => Some(ListingSort::Popularity),
            "rating" => Some(ListingSort::Rating),
            _ => None,
        }
    }
}

pub struct ListingRepo {
    pool: PgPool,
}

impl ListingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, listing: &DbListing) -> DbResult<DbListing> {
        let l = sqlx::query_as::<_, DbListing>(
            r#"
            INSERT INTO listings (id, seller_id, slug, title, description, price, currency,
                category, subcategory, brand, size, color, condition, location, is_negotiable,
                images, status, posting_fee, total_fees_paid, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20)
            RETURNING *
            "#,
        )
        .bind(listing.id)
        .bind(listing.seller_id)
        .bind(&listing.slug)
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(&listing.currency)
        .bind(&listing.category)
        .bind(&listing.subcategory)
        .bind(&listing.brand)
        .bind(&listing.size)
        .bind(&listing.color)
        .bind(&listing.condition)
        .bind(&listing.location)
        .bind(listing.is_negotiable)
        .bind(&listing.images)
        .bind(&listing.status)
        .bind(listing.posting_fee)
        .bind(listing.total_fees_paid)
        .bind(listing.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::on_insert(e, "A listing with this slug already exists"))?;
        Ok(l)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbListing>> {
        let listing = sqlx::query_as::<_, DbListing>("SELECT * FROM listings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(listing)
    }

    pub async fn find_by_slug(&self, slug: &str) -> DbResult<Option<DbListing>> {
        let listing = sqlx::query_as::<_, DbListing>("SELECT * FROM listings WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(listing)
    }

    /// Publicly visible listings matching the given filters.
    ///
    /// Only `approved` and `restored` listings are returned. The ORDER BY
    /// column comes from a fixed set, never from user input.
    pub async fn search(&self, search: &ListingSearch) -> DbResult<Vec<DbListing>> {
        let sql = format!(
            r#"
            SELECT * FROM listings
            WHERE status IN ('approved', 'restored')
              AND ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR subcategory = $2)
              AND ($3::text IS NULL OR condition = $3)
              AND ($4::text IS NULL OR brand = $4)
              AND ($5::uuid IS NULL OR seller_id = $5)
              AND ($6::numeric IS NULL OR price >= $6)
              AND ($7::numeric IS NULL OR price <= $7)
              AND ($8::text IS NULL OR title ILIKE '%' || $8 || '%' OR description ILIKE '%' || $8 || '%')
              AND (NOT $9 OR (is_featured AND (featured_until IS NULL OR featured_until > NOW())))
            ORDER BY {}
            LIMIT $10 OFFSET $11
            "#,
            search.sort.order_by()
        );
        let listings = sqlx::query_as::<_, DbListing>(&sql)
            .bind(&search.category)
            .bind(&search.subcategory)
            .bind(&search.condition)
            .bind(&search.brand)
            .bind(search.seller_id)
            .bind(search.min_price)
            .bind(search.max_price)
            .bind(&search.query)
            .bind(search.featured_only)
            .bind(search.limit)
            .bind(search.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(listings)
    }

    pub async fn find_by_seller(&self, seller_id: Uuid, limit: i64, offset: i64) -> DbResult<Vec<DbListing>> {
        let listings = sqlx::query_as::<_, DbListing>(
            "SELECT * FROM listings WHERE seller_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(seller_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }

    pub async fn find_by_status(&self, status: &str, limit: i64, offset: i64) -> DbResult<Vec<DbListing>> {
        let listings = sqlx::query_as::<_, DbListing>(
            "SELECT * FROM listings WHERE status = $1 ORDER BY created_at ASC LIMIT $2 OFFSET $3",
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }

    /// Seller edits, allowed while the listing is pending or live.
    pub async fn update_details(
        &self,
        id: Uuid,
        seller_id: Uuid,
        title: &str,
        slug: &str,
        description: &str,
        price: Decimal,
        is_negotiable: bool,
        images: &[String],
        location: Option<&str>,
    ) -> DbResult<DbListing> {
        let listing = sqlx::query_as::<_, DbListing>(
            r#"
            UPDATE listings
            SET title = $3, slug = $4, description = $5, price = $6, is_negotiable = $7,
                images = $8, location = $9, updated_at = NOW()
            WHERE id = $1 AND seller_id = $2 AND status IN ('pending', 'approved', 'restored')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(seller_id)
        .bind(title)
        .bind(slug)
        .bind(description)
        .bind(price)
        .bind(is_negotiable)
        .bind(images)
        .bind(location)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::InvalidState("Listing not found, not yours, or no longer editable".to_string()))?;
        Ok(listing)
    }

    pub async fn increment_views(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE listings SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Moderation transition. `from` pins the expected current status so a
    /// concurrent transition makes this one fail instead of double-applying.
    /// The caller validates the `from -> to` edge against the state machine.
    pub async fn set_status(
        &self,
        id: Uuid,
        from: ListingStatus,
        to: ListingStatus,
        reviewer: Uuid,
        notes: Option<&str>,
    ) -> DbResult<DbListing> {
        let listing = sqlx::query_as::<_, DbListing>(
            r#"
            UPDATE listings
            SET status = $3, reviewed_by = $4, reviewed_at = NOW(), admin_notes = $5, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(reviewer)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            DbError::InvalidState(format!("Listing is no longer {}", from.as_str()))
        })?;
        Ok(listing)
    }

    /// Unconditional admin override, bypassing the state machine. The caller
    /// records why.
    pub async fn override_status(
        &self,
        id: Uuid,
        to: ListingStatus,
        reviewer: Uuid,
        notes: &str,
    ) -> DbResult<DbListing> {
        let listing = sqlx::query_as::<_, DbListing>(
            r#"
            UPDATE listings
            SET status = $2, reviewed_by = $3, reviewed_at = NOW(), admin_notes = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(to.as_str())
        .bind(reviewer)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound("Listing not found".to_string()))?;
        Ok(listing)
    }

    /// Owner/admin deletion, refused while an accepted negotiation or a
    /// completed, non-refunded payment still references the listing.
    pub async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM listings
            WHERE id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM marketplace_messages
                  WHERE item_id = $1 AND status = 'accepted'
              )
              AND NOT EXISTS (
                  SELECT 1 FROM marketplace_payments
                  WHERE item_id = $1 AND status = 'completed'
              )
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::InvalidState(
                "Listing has an accepted negotiation or settled payments and cannot be deleted".to_string(),
            ));
        }
        Ok(())
    }

    /// Mark a listing sold at the accepted price. Guarded so two accepted
    /// offers cannot both close the sale.
    pub async fn mark_sold(&self, id: Uuid, buyer: Uuid, price: Decimal) -> DbResult<DbListing> {
        let listing = sqlx::query_as::<_, DbListing>(
            r#"
            UPDATE listings
            SET status = 'sold', sold_at = NOW(), sold_to = $2, sold_price = $3, updated_at = NOW()
            WHERE id = $1 AND status IN ('approved', 'restored')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(buyer)
        .bind(price)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::InvalidState("Listing is not open for sale".to_string()))?;
        Ok(listing)
    }

    /// Record a community flag and, when the threshold is crossed, pull the
    /// listing out of the catalogue for review. Both writes happen in one
    /// transaction so the counter and the status cannot drift apart.
    pub async fn flag(&self, flag: &DbListingFlag) -> DbResult<(DbListingFlag, DbListing)> {
        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, DbListingFlag>(
            r#"
            INSERT INTO listing_flags (id, listing_id, reporter_id, reason, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(flag.id)
        .bind(flag.listing_id)
        .bind(flag.reporter_id)
        .bind(&flag.reason)
        .bind(&flag.description)
        .fetch_one(&mut *tx)
        .await?;

        let listing = sqlx::query_as::<_, DbListing>(
            "UPDATE listings SET flag_count = flag_count + 1, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(flag.listing_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::NotFound("Listing not found".to_string()))?;

        let listing = if listing.flag_count >= FLAG_REVIEW_THRESHOLD {
            // Conditional so a listing already under review (or closed) is
            // left alone even when more flags arrive.
            sqlx::query_as::<_, DbListing>(
                r#"
                UPDATE listings
                SET status = 'flagged_for_review', flagged_for_review_at = NOW(), updated_at = NOW()
                WHERE id = $1 AND status IN ('approved', 'restored')
                RETURNING *
                "#,
            )
            .bind(flag.listing_id)
            .fetch_optional(&mut *tx)
            .await?
            .unwrap_or(listing)
        } else {
            listing
        };

        tx.commit().await?;
        Ok((saved, listing))
    }

    pub async fn flags_for(&self, listing_id: Uuid) -> DbResult<Vec<DbListingFlag>> {
        let flags = sqlx::query_as::<_, DbListingFlag>(
            "SELECT * FROM listing_flags WHERE listing_id = $1 ORDER BY created_at DESC",
        )
        .bind(listing_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(flags)
    }

    /// Admin resolution of a flagged listing: either return it to the
    /// catalogue or remove it. Flags on the listing are marked resolved.
    pub async fn resolve_flags(
        &self,
        id: Uuid,
        restore: bool,
        reviewer: Uuid,
        notes: Option<&str>,
    ) -> DbResult<DbListing> {
        let to = if restore { ListingStatus::Restored } else { ListingStatus::RemovedByFlags };

        let mut tx = self.pool.begin().await?;

        let listing = sqlx::query_as::<_, DbListing>(
            r#"
            UPDATE listings
            SET status = $2, flag_count = 0, reviewed_by = $3, reviewed_at = NOW(),
                admin_notes = $4, updated_at = NOW()
            WHERE id = $1 AND status = 'flagged_for_review'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(to.as_str())
        .bind(reviewer)
        .bind(notes)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::InvalidState("Listing is not flagged for review".to_string()))?;

        sqlx::query("UPDATE listing_flags SET resolved = TRUE WHERE listing_id = $1 AND NOT resolved")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(listing)
    }

    /// Push the expiry window out after a completed extension payment.
    ///
    /// Idempotent on the payment id: retrying with a payment that already
    /// extended this listing returns the row unchanged instead of extending
    /// twice.
    pub async fn extend_for_payment(
        &self,
        id: Uuid,
        payment_id: Uuid,
        extension_days: i32,
        fee_paid: Decimal,
        max_extensions: i32,
    ) -> DbResult<DbListing> {
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DbError::NotFound("Listing not found".to_string()))?;

        if current.last_extension_payment_id == Some(payment_id) {
            return Ok(current);
        }

        let status = ListingStatus::parse(&current.status)
            .ok_or_else(|| DbError::InvalidInput(format!("Unknown listing status: {}", current.status)))?;
        core_listing::ensure_extendable(status, current.extension_count, max_extensions)?;

        let listing = sqlx::query_as::<_, DbListing>(
            r#"
            UPDATE listings
            SET expires_at = expires_at + make_interval(days => $3),
                extension_count = extension_count + 1,
                total_fees_paid = total_fees_paid + $4,
                last_extended_at = NOW(),
                last_extension_payment_id = $2,
                updated_at = NOW()
            WHERE id = $1
              AND status IN ('approved', 'restored')
              AND extension_count < $5
              AND (last_extension_payment_id IS NULL OR last_extension_payment_id <> $2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payment_id)
        .bind(extension_days)
        .bind(fee_paid)
        .bind(max_extensions)
        .fetch_optional(&self.pool)
        .await?;

        match listing {
            Some(l) => Ok(l),
            // Lost a race: re-read and report idempotent success if the same
            // payment won, otherwise the listing really is not extendable.
            None => {
                let now = self
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| DbError::NotFound("Listing not found".to_string()))?;
                if now.last_extension_payment_id == Some(payment_id) {
                    Ok(now)
                } else {
                    Err(DbError::InvalidState("Listing can no longer be extended".to_string()))
                }
            }
        }
    }

    /// Roll a settled posting fee into the listing's paid total.
    pub async fn record_fee_payment(&self, id: Uuid, amount: Decimal) -> DbResult<()> {
        sqlx::query(
            "UPDATE listings SET total_fees_paid = total_fees_paid + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(amount)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_featured(&self, id: Uuid, until: DateTime<Utc>) -> DbResult<DbListing> {
        let listing = sqlx::query_as::<_, DbListing>(
            r#"
            UPDATE listings
            SET is_featured = TRUE, featured_until = $2, updated_at = NOW()
            WHERE id = $1 AND status IN ('approved', 'restored')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(until)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::InvalidState("Listing is not live".to_string()))?;
        Ok(listing)
    }

    /// One bulk sweep that expires every overdue listing still open.
    pub async fn sweep_expired(&self) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE listings
            SET status = 'expired', updated_at = NOW()
            WHERE expires_at < NOW()
              AND status IN ('pending', 'approved', 'restored', 'flagged_for_review')
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Listings a seller has created since the given instant. Used for the
    /// monthly free-posting allowance.
    pub async fn count_created_since(&self, seller_id: Uuid, since: DateTime<Utc>) -> DbResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM listings WHERE seller_id = $1 AND created_at >= $2",
        )
        .bind(seller_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Favorites
    // ------------------------------------------------------------------

    pub async fn add_favorite(&self, listing_id: Uuid, user_id: Uuid) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO listing_favorites (listing_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(listing_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_favorite(&self, listing_id: Uuid, user_id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM listing_favorites WHERE listing_id = $1 AND user_id = $2")
            .bind(listing_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn favorites_for_user(&self, user_id: Uuid, limit: i64, offset: i64) -> DbResult<Vec<DbListing>> {
        let listings = sqlx::query_as::<_, DbListing>(
            r#"
            SELECT l.* FROM listings l
            JOIN listing_favorites f ON f.listing_id = l.id
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }
}
