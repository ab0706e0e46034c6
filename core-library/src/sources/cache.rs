//! Data cache interface and in-memory implementation
//!
//! The cache holds normalized content records plus the user's bookmarks and
//! progressions. Queries are push-based: each subscription emits the current
//! projection immediately and again after every applied update.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use core_async::stream::{watch_stream, ReactiveStreamExt};
use core_async::sync::watch;
use futures::StreamExt;
use tracing::{debug, warn};

use super::ContentStream;
use crate::error::{LibraryError, Result};
use crate::models::{
    Bookmark, CachedContentSummaryState, CachedDynamicContentState, ChildContentsState, Content,
    ContentCategory, ContentDomain, ContentId, ContentPersistableState, DataCacheUpdate, Group,
    GroupId, Progression,
};

/// Derived store of content summaries and dynamic state.
#[async_trait]
pub trait DataCache: Send + Sync {
    /// Apply a batch of entity changes.
    ///
    /// Never fails the caller. Problems with individual records surface to
    /// the subscriptions that depend on them.
    fn update(&self, update: DataCacheUpdate);

    /// Subscribe to the raw summary of one content item.
    fn content_summary_state(&self, content_id: ContentId)
        -> ContentStream<CachedContentSummaryState>;

    /// Subscribe to the raw summaries of several content items, in input order.
    fn content_summary_states(
        &self,
        content_ids: &[ContentId],
    ) -> ContentStream<Vec<CachedContentSummaryState>>;

    /// Subscribe to the grouped children of a collection.
    fn child_contents_state(&self, content_id: ContentId) -> ContentStream<ChildContentsState>;

    /// Subscribe to the progression and bookmark of one content item.
    fn content_dynamic_state(&self, content_id: ContentId)
        -> ContentStream<CachedDynamicContentState>;

    /// Read what the cache currently holds about one content item.
    ///
    /// # Returns
    /// - `Ok(Some(state))` if the item is cached
    /// - `Ok(None)` if it is not
    /// - `Err` if the cache cannot be read
    async fn cached_content_persistable_state(
        &self,
        content_id: ContentId,
    ) -> Result<Option<ContentPersistableState>>;
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable view of the cache contents at one point in time.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    contents: HashMap<ContentId, Content>,
    groups: HashMap<GroupId, Group>,
    content_domains: HashMap<ContentId, Vec<ContentDomain>>,
    content_categories: HashMap<ContentId, Vec<ContentCategory>>,
    bookmarks: HashMap<ContentId, Bookmark>,
    progressions: HashMap<ContentId, Progression>,
}

impl CacheSnapshot {
    /// Upsert every record of `update`, then apply its deletions.
    ///
    /// Domain and category associations replace the full association set of
    /// each content id they mention.
    pub fn apply(&mut self, update: DataCacheUpdate) {
        for content in update.contents {
            if let Err(error) = content.validate() {
                warn!(content_id = content.id, %error, "Skipping invalid content record");
                continue;
            }
            self.contents.insert(content.id, content);
        }

        for group in update.groups {
            self.groups.insert(group.id, group);
        }

        let mut replaced: HashSet<ContentId> = HashSet::new();
        for association in update.content_domains {
            let entry = self.content_domains.entry(association.content_id).or_default();
            if replaced.insert(association.content_id) {
                entry.clear();
            }
            if !entry.contains(&association) {
                entry.push(association);
            }
        }

        replaced.clear();
        for association in update.content_categories {
            let entry = self
                .content_categories
                .entry(association.content_id)
                .or_default();
            if replaced.insert(association.content_id) {
                entry.clear();
            }
            if !entry.contains(&association) {
                entry.push(association);
            }
        }

        for bookmark in update.bookmarks {
            self.bookmarks.insert(bookmark.content_id, bookmark);
        }

        for progression in update.progressions {
            self.progressions.insert(progression.content_id, progression);
        }

        for content_id in update.bookmark_deletion_content_ids {
            self.bookmarks.remove(&content_id);
        }

        for content_id in update.progression_deletion_content_ids {
            self.progressions.remove(&content_id);
        }
    }

    fn content(&self, content_id: ContentId) -> Result<&Content> {
        self.contents
            .get(&content_id)
            .ok_or_else(|| LibraryError::content_miss(content_id))
    }

    fn parent_content(&self, content: &Content) -> Option<Content> {
        let group = self.groups.get(&content.group_id?)?;
        self.contents.get(&group.content_id).cloned()
    }

    fn groups_of(&self, content_id: ContentId) -> Vec<Group> {
        let mut groups: Vec<Group> = self
            .groups
            .values()
            .filter(|group| group.content_id == content_id)
            .cloned()
            .collect();
        groups.sort_by_key(|group| (group.ordinal, group.id));
        groups
    }

    fn children_of(&self, groups: &[Group]) -> Vec<Content> {
        let group_rank: HashMap<GroupId, usize> = groups
            .iter()
            .enumerate()
            .map(|(rank, group)| (group.id, rank))
            .collect();

        let mut children: Vec<(usize, &Content)> = self
            .contents
            .values()
            .filter_map(|content| {
                let rank = group_rank.get(&content.group_id?)?;
                Some((*rank, content))
            })
            .collect();
        children.sort_by_key(|(rank, content)| (*rank, content.ordinal, content.id));

        children
            .into_iter()
            .map(|(_, content)| content.clone())
            .collect()
    }

    /// Raw summary of one item, or a cache miss.
    pub fn summary(&self, content_id: ContentId) -> Result<CachedContentSummaryState> {
        let content = self.content(content_id)?;

        Ok(CachedContentSummaryState {
            content: content.clone(),
            content_domains: self
                .content_domains
                .get(&content_id)
                .cloned()
                .unwrap_or_default(),
            content_categories: self
                .content_categories
                .get(&content_id)
                .cloned()
                .unwrap_or_default(),
            parent_content: self.parent_content(content),
        })
    }

    /// Raw summaries of the cached items among `content_ids`, in input order.
    pub fn summaries(&self, content_ids: &[ContentId]) -> Vec<CachedContentSummaryState> {
        content_ids
            .iter()
            .filter_map(|content_id| self.summary(*content_id).ok())
            .collect()
    }

    /// Grouped children of a collection, or a cache miss for the collection.
    pub fn child_contents(&self, content_id: ContentId) -> Result<ChildContentsState> {
        self.content(content_id)?;

        let groups = self.groups_of(content_id);
        let contents = self.children_of(&groups);

        Ok(ChildContentsState {
            parent_content_id: content_id,
            groups,
            contents,
        })
    }

    /// Progression and bookmark of one item; both absent is a valid state.
    pub fn dynamic(&self, content_id: ContentId) -> CachedDynamicContentState {
        CachedDynamicContentState {
            progression: self.progressions.get(&content_id).cloned(),
            bookmark: self.bookmarks.get(&content_id).cloned(),
        }
    }

    /// Everything cached about one item, if the item itself is cached.
    pub fn persistable(&self, content_id: ContentId) -> Option<ContentPersistableState> {
        let summary = self.summary(content_id).ok()?;
        let dynamic = self.dynamic(content_id);
        let groups = self.groups_of(content_id);
        let child_contents = self.children_of(&groups);

        Some(ContentPersistableState {
            content: summary.content,
            content_domains: summary.content_domains,
            content_categories: summary.content_categories,
            bookmark: dynamic.bookmark,
            parent_content: summary.parent_content,
            progression: dynamic.progression,
            groups,
            child_contents,
        })
    }

    /// Number of cached content records.
    pub fn content_count(&self) -> usize {
        self.contents.len()
    }
}

// =============================================================================
// In-Memory Implementation
// =============================================================================

/// [`DataCache`] backed by a watched [`CacheSnapshot`].
///
/// Updates are applied copy-on-write; subscribers that poll slower than
/// updates arrive observe the latest snapshot only.
pub struct InMemoryDataCache {
    snapshot: watch::Sender<Arc<CacheSnapshot>>,
}

impl InMemoryDataCache {
    /// Create an empty cache
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(CacheSnapshot::default()));
        Self { snapshot }
    }

    /// Current snapshot of the cache contents.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Number of live subscriptions.
    pub fn observer_count(&self) -> usize {
        self.snapshot.receiver_count()
    }

    /// Stream `project` over every snapshot, ending after the first error.
    fn project<T, F>(&self, project: F) -> ContentStream<T>
    where
        T: Send + 'static,
        F: Fn(&CacheSnapshot) -> Result<T> + Send + Unpin + 'static,
    {
        watch_stream(self.snapshot.subscribe())
            .map(move |snapshot| project(snapshot.as_ref()))
            .until_error()
            .boxed()
    }
}

impl Default for InMemoryDataCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataCache for InMemoryDataCache {
    fn update(&self, update: DataCacheUpdate) {
        if update.is_empty() {
            debug!("Ignoring empty cache update");
            return;
        }

        self.snapshot
            .send_modify(|snapshot| Arc::make_mut(snapshot).apply(update));
    }

    fn content_summary_state(
        &self,
        content_id: ContentId,
    ) -> ContentStream<CachedContentSummaryState> {
        self.project(move |snapshot| snapshot.summary(content_id))
    }

    fn content_summary_states(
        &self,
        content_ids: &[ContentId],
    ) -> ContentStream<Vec<CachedContentSummaryState>> {
        let content_ids = content_ids.to_vec();
        self.project(move |snapshot| Ok(snapshot.summaries(&content_ids)))
    }

    fn child_contents_state(&self, content_id: ContentId) -> ContentStream<ChildContentsState> {
        self.project(move |snapshot| snapshot.child_contents(content_id))
    }

    fn content_dynamic_state(
        &self,
        content_id: ContentId,
    ) -> ContentStream<CachedDynamicContentState> {
        self.project(move |snapshot| Ok(snapshot.dynamic(content_id)))
    }

    async fn cached_content_persistable_state(
        &self,
        content_id: ContentId,
    ) -> Result<Option<ContentPersistableState>> {
        Ok(self.snapshot.borrow().persistable(content_id))
    }
}
