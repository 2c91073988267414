use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::error::Result;
use crate::models::listing::ListingRecord;
use crate::services::listing_store::ListingStore;

/// A pretty-printed JSON array on disk. Every write rewrites the whole file;
/// an appending store keeps the records already there ahead of the batch.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    append: bool,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append: false,
        }
    }

    pub fn appending(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append: true,
        }
    }
}

#[async_trait]
impl ListingStore for JsonFileStore {
    async fn existing_ids(&self) -> Result<HashSet<String>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .map(|listing| listing.id)
            .collect())
    }

    #[instrument(skip_all, fields(path = %self.path.display(), count = listings.len()))]
    async fn insert_many(&self, listings: &[ListingRecord]) -> Result<u64> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = if self.append {
            let mut stored = self.list_all().await?;
            stored.extend_from_slice(listings);
            serde_json::to_vec_pretty(&stored)?
        } else {
            serde_json::to_vec_pretty(listings)?
        };
        tokio::fs::write(&self.path, body).await?;
        info!(append = self.append, "Listings written");
        Ok(listings.len() as u64)
    }

    async fn list_all(&self) -> Result<Vec<ListingRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}
