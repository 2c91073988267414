use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::listing::ListingRecord;

/// Where listings are persisted and read back from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Identifiers of every stored listing.
    async fn existing_ids(&self) -> Result<HashSet<String>>;

    /// Writes one batch in order and returns how many rows were written.
    async fn insert_many(&self, listings: &[ListingRecord]) -> Result<u64>;

    async fn list_all(&self) -> Result<Vec<ListingRecord>>;
}
