//! # Content Repository
//!
//! Single entry point for content state. The repository combines a
//! [`DataCache`] (summaries, children, bookmarks, progressions) with a
//! [`PersistenceStore`] (domains, categories, downloads) and hands out
//! push-based subscriptions over the merged projections.
//!
//! ## Subscriptions
//!
//! Every query returns a [`ContentStream`]. The first value arrives as soon
//! as the underlying sources have one; later values follow every relevant
//! [`ContentRepository::apply`] or store change. Dropping the stream cancels
//! it along with every upstream subscription it owns.
//!
//! Errors from an underlying stream are delivered once and end the
//! subscription. Failed domain or category lookups are not errors: the
//! affected field is emitted empty and the failure is reported through
//! `tracing` and the [`EventBus`].
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use core_library::{ContentRepository, InMemoryDataCache, InMemoryPersistenceStore};
//!
//! let repository = ContentRepository::builder()
//!     .data_cache(Arc::new(InMemoryDataCache::new()))
//!     .persistence_store(Arc::new(InMemoryPersistenceStore::new()))
//!     .build()?;
//! # let _ = repository;
//! # Ok::<(), core_library::LibraryError>(())
//! ```

use std::sync::Arc;

use core_async::stream::ReactiveStreamExt;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, SubscriptionEvent};
use futures::future::join_all;
use futures::StreamExt;
use tracing::{debug, instrument, warn};

use crate::error::{LibraryError, Result};
use crate::models::{
    Category, ChildContentsState, ContentId, ContentPersistableState, ContentSummaryState,
    DataCacheUpdate, Domain, DynamicContentState,
};
use crate::resolver::RelationResolver;
use crate::sources::{ContentStream, DataCache, PersistenceStore};

/// Reactive façade over the data cache and the persistence store.
///
/// Cloning is cheap; clones share the same collaborators and event bus.
#[derive(Clone)]
pub struct ContentRepository {
    cache: Arc<dyn DataCache>,
    store: Arc<dyn PersistenceStore>,
    events: EventBus,
    resolver: RelationResolver,
}

impl ContentRepository {
    /// Creates a builder for assembling a repository.
    pub fn builder() -> ContentRepositoryBuilder {
        ContentRepositoryBuilder::default()
    }

    /// Event bus the repository publishes to.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Forward a batch of changes to the data cache.
    ///
    /// Never fails; subscriptions affected by the update emit afterwards.
    #[instrument(skip(self, update))]
    pub fn apply(&self, update: DataCacheUpdate) {
        let contents = update.contents.len();
        let bookmarks = update.bookmarks.len() + update.bookmark_deletion_content_ids.len();
        let progressions =
            update.progressions.len() + update.progression_deletion_content_ids.len();

        debug!(contents, bookmarks, progressions, "Applying cache update");
        self.cache.update(update);

        let _ = self
            .events
            .emit(CoreEvent::Library(LibraryEvent::CacheUpdated {
                contents,
                bookmarks,
                progressions,
            }));
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// Subscribe to the resolved summary of one content item.
    ///
    /// Re-emits on every upstream change, including unchanged values.
    #[instrument(skip(self))]
    pub fn content_summary_state(&self, content_id: ContentId) -> ContentStream<ContentSummaryState> {
        debug!("Subscribing to content summary");
        let resolver = self.resolver.clone();

        let summaries = self
            .cache
            .content_summary_state(content_id)
            .then(move |cached| {
                let resolver = resolver.clone();
                async move { Ok::<_, LibraryError>(resolver.summary(cached?).await) }
            });

        self.observe("content_summary_state", vec![content_id], summaries)
    }

    /// Subscribe to the resolved summaries of several items, in cache order.
    #[instrument(skip(self))]
    pub fn content_summary_states(
        &self,
        content_ids: &[ContentId],
    ) -> ContentStream<Vec<ContentSummaryState>> {
        debug!("Subscribing to content summaries");
        let resolver = self.resolver.clone();

        let summaries = self
            .cache
            .content_summary_states(content_ids)
            .then(move |cached| {
                let resolver = resolver.clone();
                async move {
                    let cached = cached?;
                    let resolved = join_all(cached.into_iter().map(|c| resolver.summary(c))).await;
                    Ok::<_, LibraryError>(resolved)
                }
            });

        self.observe("content_summary_states", content_ids.to_vec(), summaries)
    }

    /// Subscribe to the grouped children of a collection.
    #[instrument(skip(self))]
    pub fn child_contents_state(&self, content_id: ContentId) -> ContentStream<ChildContentsState> {
        debug!("Subscribing to child contents");
        let children = self.cache.child_contents_state(content_id);
        self.observe("child_contents_state", vec![content_id], children)
    }

    /// Subscribe to the merged download, progression and bookmark state.
    ///
    /// Emits whenever either source changes, skipping values equal to the
    /// previous emission.
    #[instrument(skip(self))]
    pub fn content_dynamic_state(&self, content_id: ContentId) -> ContentStream<DynamicContentState> {
        debug!("Subscribing to dynamic content state");

        let dynamic = self
            .cache
            .content_dynamic_state(content_id)
            .combine_latest(self.store.download(content_id))
            .map(|latest| latest.map(|(cached, download)| DynamicContentState::new(cached, download)))
            .dedup();

        self.observe("content_dynamic_state", vec![content_id], dynamic)
    }

    // -------------------------------------------------------------------------
    // One-shot Access
    // -------------------------------------------------------------------------

    /// Everything the cache currently holds about one item.
    ///
    /// # Returns
    /// - `Ok(Some(state))` if the item is cached
    /// - `Ok(None)` if it is not
    #[instrument(skip(self))]
    pub async fn content_persistable_state(
        &self,
        content_id: ContentId,
    ) -> Result<Option<ContentPersistableState>> {
        self.cache.cached_content_persistable_state(content_id).await
    }

    /// All stored domains.
    #[instrument(skip(self))]
    pub async fn domain_list(&self) -> Result<Vec<Domain>> {
        self.store.domain_list().await
    }

    /// Overwrite the stored domains with an authoritative list.
    #[instrument(skip(self, domains), fields(count = domains.len()))]
    pub async fn sync_domain_list(&self, domains: &[Domain]) -> Result<()> {
        self.store.sync_domains(domains).await?;
        debug!("Domain table synchronized");

        let _ = self
            .events
            .emit(CoreEvent::Library(LibraryEvent::DomainsSynced {
                count: domains.len(),
            }));
        Ok(())
    }

    /// All stored categories.
    #[instrument(skip(self))]
    pub async fn category_list(&self) -> Result<Vec<Category>> {
        self.store.category_list().await
    }

    /// Overwrite the stored categories with an authoritative list.
    #[instrument(skip(self, categories), fields(count = categories.len()))]
    pub async fn sync_category_list(&self, categories: &[Category]) -> Result<()> {
        self.store.sync_categories(categories).await?;
        debug!("Category table synchronized");

        let _ = self
            .events
            .emit(CoreEvent::Library(LibraryEvent::CategoriesSynced {
                count: categories.len(),
            }));
        Ok(())
    }

    /// Box a subscription, ending it at the first error and reporting that
    /// error on the way out.
    fn observe<T, S>(&self, query: &'static str, content_ids: Vec<ContentId>, stream: S) -> ContentStream<T>
    where
        T: Send + 'static,
        S: futures::Stream<Item = Result<T>> + Send + 'static,
    {
        let events = self.events.clone();

        stream
            .boxed()
            .until_error()
            .inspect(move |item| {
                if let Err(error) = item {
                    warn!(query, ?content_ids, %error, "Subscription failed");
                    let _ = events.emit(CoreEvent::Subscription(SubscriptionEvent::Failed {
                        query: query.to_string(),
                        content_ids: content_ids.clone(),
                        message: error.to_string(),
                    }));
                }
            })
            .boxed()
    }
}

/// Builder for [`ContentRepository`].
pub struct ContentRepositoryBuilder {
    data_cache: Option<Arc<dyn DataCache>>,
    persistence_store: Option<Arc<dyn PersistenceStore>>,
    event_bus: Option<EventBus>,
    report_resolution_failures: bool,
}

impl Default for ContentRepositoryBuilder {
    fn default() -> Self {
        Self {
            data_cache: None,
            persistence_store: None,
            event_bus: None,
            report_resolution_failures: true,
        }
    }
}

impl ContentRepositoryBuilder {
    pub fn data_cache(mut self, cache: Arc<dyn DataCache>) -> Self {
        self.data_cache = Some(cache);
        self
    }

    pub fn persistence_store(mut self, store: Arc<dyn PersistenceStore>) -> Self {
        self.persistence_store = Some(store);
        self
    }

    /// Publish to an existing bus instead of a private one.
    pub fn event_bus(mut self, events: EventBus) -> Self {
        self.event_bus = Some(events);
        self
    }

    /// Whether failed domain/category lookups are published as events.
    pub fn report_resolution_failures(mut self, enabled: bool) -> Self {
        self.report_resolution_failures = enabled;
        self
    }

    /// Assemble the repository.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::CapabilityMissing`] if the data cache or the
    /// persistence store was not provided.
    pub fn build(self) -> Result<ContentRepository> {
        let cache = self
            .data_cache
            .ok_or_else(|| LibraryError::CapabilityMissing {
                capability: "DataCache".to_string(),
                message: "Call .data_cache() before building the repository".to_string(),
            })?;

        let store = self
            .persistence_store
            .ok_or_else(|| LibraryError::CapabilityMissing {
                capability: "PersistenceStore".to_string(),
                message: "Call .persistence_store() before building the repository".to_string(),
            })?;

        let events = self.event_bus.unwrap_or_default();
        let resolver = RelationResolver::new(
            Arc::clone(&store),
            events.clone(),
            self.report_resolution_failures,
        );

        Ok(ContentRepository {
            cache,
            store,
            events,
            resolver,
        })
    }
}
