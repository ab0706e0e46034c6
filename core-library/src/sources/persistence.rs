//! Persistence store interface and in-memory implementation
//!
//! The store owns the durable tables of domains and categories and the
//! download records. Domain and category reads are one-shot; downloads are
//! observed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use core_async::stream::watch_stream;
use core_async::sync::{watch, RwLock};
use futures::StreamExt;
use tracing::debug;

use super::ContentStream;
use crate::error::Result;
use crate::models::{Category, CategoryId, ContentId, Domain, DomainId, Download};

/// Durable storage for relational entities and downloads.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Subscribe to the download record of one content item.
    ///
    /// Emits `None` while no download exists.
    fn download(&self, content_id: ContentId) -> ContentStream<Option<Download>>;

    /// All stored domains.
    async fn domain_list(&self) -> Result<Vec<Domain>>;

    /// All stored categories.
    async fn category_list(&self) -> Result<Vec<Category>>;

    /// Stored domains whose ids are in `ids`. Unknown ids are ignored.
    async fn domains(&self, ids: &[DomainId]) -> Result<Vec<Domain>>;

    /// Stored categories whose ids are in `ids`. Unknown ids are ignored.
    async fn categories(&self, ids: &[CategoryId]) -> Result<Vec<Category>>;

    /// Replace the stored domain table with `domains`.
    async fn sync_domains(&self, domains: &[Domain]) -> Result<()>;

    /// Replace the stored category table with `categories`.
    async fn sync_categories(&self, categories: &[Category]) -> Result<()>;
}

type DownloadTable = Arc<HashMap<ContentId, Download>>;

/// [`PersistenceStore`] that keeps every table in memory.
///
/// Lists come back ordered by id.
pub struct InMemoryPersistenceStore {
    domains: RwLock<BTreeMap<DomainId, Domain>>,
    categories: RwLock<BTreeMap<CategoryId, Category>>,
    downloads: watch::Sender<DownloadTable>,
}

impl InMemoryPersistenceStore {
    pub fn new() -> Self {
        let (downloads, _) = watch::channel(DownloadTable::default());
        Self {
            domains: RwLock::new(BTreeMap::new()),
            categories: RwLock::new(BTreeMap::new()),
            downloads,
        }
    }

    /// Insert or replace the download record of its content item.
    pub fn save_download(&self, download: Download) {
        debug!(
            content_id = download.content_id,
            state = ?download.state,
            progress = download.progress,
            "Saving download"
        );
        self.downloads.send_modify(|table| {
            Arc::make_mut(table).insert(download.content_id, download);
        });
    }

    /// Remove the download record of a content item, returning it if present.
    pub fn remove_download(&self, content_id: ContentId) -> Option<Download> {
        let mut removed = None;
        self.downloads.send_if_modified(|table| {
            if !table.contains_key(&content_id) {
                return false;
            }
            removed = Arc::make_mut(table).remove(&content_id);
            true
        });
        removed
    }

    /// Number of live download subscriptions.
    pub fn observer_count(&self) -> usize {
        self.downloads.receiver_count()
    }

    /// Current download record of a content item.
    pub fn download_for(&self, content_id: ContentId) -> Option<Download> {
        self.downloads.borrow().get(&content_id).cloned()
    }
}

impl Default for InMemoryPersistenceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceStore for InMemoryPersistenceStore {
    fn download(&self, content_id: ContentId) -> ContentStream<Option<Download>> {
        watch_stream(self.downloads.subscribe())
            .map(move |table| Ok(table.get(&content_id).cloned()))
            .boxed()
    }

    async fn domain_list(&self) -> Result<Vec<Domain>> {
        Ok(self.domains.read().await.values().cloned().collect())
    }

    async fn category_list(&self) -> Result<Vec<Category>> {
        Ok(self.categories.read().await.values().cloned().collect())
    }

    async fn domains(&self, ids: &[DomainId]) -> Result<Vec<Domain>> {
        let table = self.domains.read().await;
        Ok(table
            .values()
            .filter(|domain| ids.contains(&domain.id))
            .cloned()
            .collect())
    }

    async fn categories(&self, ids: &[CategoryId]) -> Result<Vec<Category>> {
        let table = self.categories.read().await;
        Ok(table
            .values()
            .filter(|category| ids.contains(&category.id))
            .cloned()
            .collect())
    }

    async fn sync_domains(&self, domains: &[Domain]) -> Result<()> {
        let mut table = self.domains.write().await;
        *table = domains
            .iter()
            .map(|domain| (domain.id, domain.clone()))
            .collect();
        Ok(())
    }

    async fn sync_categories(&self, categories: &[Category]) -> Result<()> {
        let mut table = self.categories.write().await;
        *table = categories
            .iter()
            .map(|category| (category.id, category.clone()))
            .collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DownloadState;
    use crate::testing::{category, domain};

    #[tokio::test]
    async fn test_sync_replaces_domain_table() {
        let store = InMemoryPersistenceStore::new();
        store
            .sync_domains(&[domain(3), domain(1), domain(2)])
            .await
            .unwrap();
        store.sync_domains(&[domain(5), domain(4)]).await.unwrap();

        let ids: Vec<DomainId> = store
            .domain_list()
            .await
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_lookup_ignores_unknown_ids() {
        let store = InMemoryPersistenceStore::new();
        store
            .sync_categories(&[category(1), category(2)])
            .await
            .unwrap();

        let found = store.categories(&[2, 99]).await.unwrap();
        assert_eq!(found, vec![category(2)]);
        assert!(store.categories(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_stream_follows_saves_and_removals() {
        let store = InMemoryPersistenceStore::new();
        let mut downloads = store.download(42);

        assert_eq!(downloads.next().await, Some(Ok(None)));

        let download = Download::new(42).with_progress(DownloadState::InProgress, 0.4);
        store.save_download(download.clone());
        assert_eq!(downloads.next().await, Some(Ok(Some(download))));

        assert!(store.remove_download(42).is_some());
        assert_eq!(downloads.next().await, Some(Ok(None)));
        assert!(store.remove_download(42).is_none());
    }

    #[tokio::test]
    async fn test_download_for_other_content_is_isolated() {
        let store = InMemoryPersistenceStore::new();
        store.save_download(Download::new(7));

        assert!(store.download_for(7).is_some());
        assert!(store.download_for(42).is_none());
    }
}
