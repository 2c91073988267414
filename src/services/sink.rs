use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::models::listing::ListingRecord;
use crate::services::listing_store::ListingStore;

/// Filters applied to a batch before it is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkPolicy {
    /// Drop listings whose id the store already holds.
    pub skip_existing: bool,
    /// Drop listings with any empty or absent field.
    pub complete_only: bool,
}

/// Filters `listings` per `policy` and writes what is left in one batch.
/// Returns the number of rows written; an empty batch is not written.
#[instrument(skip_all, fields(count = listings.len()))]
pub async fn persist(
    store: &dyn ListingStore,
    listings: Vec<ListingRecord>,
    policy: SinkPolicy,
) -> Result<u64> {
    let mut batch = listings;

    if policy.complete_only {
        let before = batch.len();
        batch.retain(ListingRecord::is_complete);
        let dropped = before - batch.len();
        if dropped > 0 {
            info!(dropped, "Dropped incomplete listings");
        }
    }

    if policy.skip_existing && !batch.is_empty() {
        let existing = store.existing_ids().await?;
        let before = batch.len();
        batch.retain(|listing| !existing.contains(&listing.id));
        let dropped = before - batch.len();
        if dropped > 0 {
            info!(dropped, "Dropped listings already stored");
        }
    }

    if batch.is_empty() {
        warn!("No listings to save");
        return Ok(0);
    }

    let written = store.insert_many(&batch).await?;
    info!(written, "Saved listings");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::listing::{PayPeriod, WorkType};
    use crate::services::listing_store::MockListingStore;
    use chrono::{NaiveDate, Utc};
    use std::collections::HashSet;

    fn listing(id: &str) -> ListingRecord {
        ListingRecord {
            id: id.to_string(),
            search_keyword: "Bartender".into(),
            location: "Perth".into(),
            title: "Bartender".into(),
            employer: "Harbour Bar".into(),
            work_type: Some(WorkType::Casual),
            salary: "$30 per hour".into(),
            min_salary: Some(30.0),
            max_salary: Some(30.0),
            pay_period: Some(PayPeriod::Hourly),
            date_posted: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            summary: "Cocktail bartender wanted.".into(),
            description_html: "<p>Cocktail bartender wanted.</p>".into(),
            listing_url: format!("https://au.jora.com/job/Bartender-{id}"),
            apply_url: "https://au.jora.com/job/rd/apply".into(),
            emails: vec![],
            source: "Jora Australia".into(),
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn skips_ids_already_stored() {
        let mut store = MockListingStore::new();
        store
            .expect_existing_ids()
            .times(1)
            .returning(|| Ok(HashSet::from(["a".to_string()])));
        store
            .expect_insert_many()
            .withf(|batch: &[ListingRecord]| batch.len() == 1 && batch[0].id == "b")
            .times(1)
            .returning(|batch| Ok(batch.len() as u64));

        let policy = SinkPolicy {
            skip_existing: true,
            ..SinkPolicy::default()
        };
        let written =
            tokio_test::assert_ok!(persist(&store, vec![listing("a"), listing("b")], policy).await);
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn complete_only_drops_listings_with_gaps() {
        let mut incomplete = listing("b");
        incomplete.work_type = None;
        let mut empty_apply = listing("c");
        empty_apply.apply_url = String::new();

        let mut store = MockListingStore::new();
        store.expect_existing_ids().never();
        store
            .expect_insert_many()
            .withf(|batch: &[ListingRecord]| batch.iter().map(|l| l.id.as_str()).eq(["a"]))
            .returning(|batch| Ok(batch.len() as u64));

        let policy = SinkPolicy {
            complete_only: true,
            ..SinkPolicy::default()
        };
        let written = persist(&store, vec![listing("a"), incomplete, empty_apply], policy)
            .await
            .unwrap();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn empty_batch_is_not_written() {
        let mut store = MockListingStore::new();
        store.expect_insert_many().never();
        assert_eq!(
            persist(&store, Vec::new(), SinkPolicy::default()).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn write_failure_is_returned() {
        let mut store = MockListingStore::new();
        store.expect_insert_many().returning(|_| {
            Err(crate::error::Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        });
        tokio_test::assert_err!(persist(&store, vec![listing("a")], SinkPolicy::default()).await);
    }
}
