use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::models::listing::ListingRecord;
use crate::services::listing_store::ListingStore;

/// Postgres-backed store over the `listings` table.
#[derive(Clone)]
pub struct ListingService {
    pool: PgPool,
}

impl ListingService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingStore for ListingService {
    async fn existing_ids(&self) -> Result<HashSet<String>> {
        let ids: Vec<(String,)> = sqlx::query_as("SELECT DISTINCT id FROM listings")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    #[instrument(skip_all, fields(count = listings.len()))]
    async fn insert_many(&self, listings: &[ListingRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for listing in listings {
            let result = sqlx::query(
                r#"
                INSERT INTO listings (
                    id, search_keyword, location, title, employer,
                    work_type, salary, min_salary, max_salary, pay_period,
                    date_posted, summary, description_html, listing_url, apply_url,
                    emails, source, scraped_at
                ) VALUES (
                    $1, $2, $3, $4, $5,
                    $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15,
                    $16, $17, $18
                )
                "#,
            )
            .bind(&listing.id)
            .bind(&listing.search_keyword)
            .bind(&listing.location)
            .bind(&listing.title)
            .bind(&listing.employer)
            .bind(listing.work_type.map(|wt| wt.as_str()))
            .bind(&listing.salary)
            .bind(listing.min_salary)
            .bind(listing.max_salary)
            .bind(listing.pay_period.map(|p| p.as_str()))
            .bind(listing.date_posted)
            .bind(&listing.summary)
            .bind(&listing.description_html)
            .bind(&listing.listing_url)
            .bind(&listing.apply_url)
            .bind(&listing.emails)
            .bind(&listing.source)
            .bind(listing.scraped_at)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        debug!(inserted, "Listings committed");
        Ok(inserted)
    }

    async fn list_all(&self) -> Result<Vec<ListingRecord>> {
        let listings = sqlx::query_as::<_, ListingRecord>(
            r#"
            SELECT * FROM listings
            ORDER BY row_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(listings)
    }
}
