//! Domain and category resolution for summary projections
//!
//! Lookups here are auxiliary: a failed lookup is logged, optionally
//! published on the event bus, and replaced by an empty list so the summary
//! it belongs to is still delivered.

use std::sync::Arc;

use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use tracing::warn;

use crate::error::LibraryError;
use crate::models::{
    CachedContentSummaryState, Category, ContentCategory, ContentDomain, ContentSummaryState,
    Domain,
};
use crate::sources::PersistenceStore;

/// Resolves association records into the entities they reference.
#[derive(Clone)]
pub struct RelationResolver {
    store: Arc<dyn PersistenceStore>,
    events: EventBus,
    report_failures: bool,
}

impl RelationResolver {
    pub fn new(store: Arc<dyn PersistenceStore>, events: EventBus, report_failures: bool) -> Self {
        Self {
            store,
            events,
            report_failures,
        }
    }

    /// Domains referenced by `associations`, or empty if the lookup fails.
    pub async fn domains(&self, associations: &[ContentDomain]) -> Vec<Domain> {
        if associations.is_empty() {
            return Vec::new();
        }

        let ids: Vec<i64> = associations.iter().map(|a| a.domain_id).collect();
        match self.store.domains(&ids).await {
            Ok(domains) => domains,
            Err(error) => {
                self.report("domains", ids, error);
                Vec::new()
            }
        }
    }

    /// Categories referenced by `associations`, or empty if the lookup fails.
    pub async fn categories(&self, associations: &[ContentCategory]) -> Vec<Category> {
        if associations.is_empty() {
            return Vec::new();
        }

        let ids: Vec<i64> = associations.iter().map(|a| a.category_id).collect();
        match self.store.categories(&ids).await {
            Ok(categories) => categories,
            Err(error) => {
                self.report("categories", ids, error);
                Vec::new()
            }
        }
    }

    /// Turn a raw cache summary into a presentation-ready one.
    pub async fn summary(&self, cached: CachedContentSummaryState) -> ContentSummaryState {
        let domains = self.domains(&cached.content_domains).await;
        let categories = self.categories(&cached.content_categories).await;

        ContentSummaryState {
            content: cached.content,
            domains,
            categories,
            parent_content: cached.parent_content,
        }
    }

    fn report(&self, relation: &str, ids: Vec<i64>, error: LibraryError) {
        warn!(relation, ?ids, %error, "Relation lookup failed; continuing with empty list");

        if !self.report_failures {
            return;
        }

        // No subscribers is fine
        let _ = self
            .events
            .emit(CoreEvent::Library(LibraryEvent::RelationResolutionFailed {
                relation: relation.to_string(),
                ids,
                message: error.to_string(),
            }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::InMemoryPersistenceStore;
    use crate::testing::{category, domain, episode};

    fn cached_summary() -> CachedContentSummaryState {
        CachedContentSummaryState {
            content: episode(42),
            content_domains: vec![ContentDomain {
                content_id: 42,
                domain_id: 1,
            }],
            content_categories: vec![
                ContentCategory {
                    content_id: 42,
                    category_id: 2,
                },
                ContentCategory {
                    content_id: 42,
                    category_id: 3,
                },
            ],
            parent_content: None,
        }
    }

    #[tokio::test]
    async fn test_summary_resolves_both_relations() {
        let store = Arc::new(InMemoryPersistenceStore::new());
        store.sync_domains(&[domain(1), domain(9)]).await.unwrap();
        store
            .sync_categories(&[category(2), category(3), category(4)])
            .await
            .unwrap();

        let resolver = RelationResolver::new(store, EventBus::default(), true);
        let summary = resolver.summary(cached_summary()).await;

        assert_eq!(summary.content.id, 42);
        assert_eq!(summary.domains, vec![domain(1)]);
        assert_eq!(summary.categories, vec![category(2), category(3)]);
    }

    #[tokio::test]
    async fn test_empty_associations_resolve_to_empty() {
        let resolver = RelationResolver::new(
            Arc::new(InMemoryPersistenceStore::new()),
            EventBus::default(),
            true,
        );

        assert!(resolver.domains(&[]).await.is_empty());
        assert!(resolver.categories(&[]).await.is_empty());
    }
}
