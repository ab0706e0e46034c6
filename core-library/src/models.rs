//! Domain models for the content library
//!
//! Entities are plain values: every projection handed to a subscriber is a
//! fresh copy built from the latest cache or store state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LibraryError, Result};

// =============================================================================
// ID Types
// =============================================================================

/// Identifier of a content item
pub type ContentId = i64;
/// Identifier of a domain
pub type DomainId = i64;
/// Identifier of a category
pub type CategoryId = i64;
/// Identifier of a group of child contents
pub type GroupId = i64;

// =============================================================================
// Content
// =============================================================================

/// Kind of content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Collection,
    Episode,
    Screencast,
    Article,
    Product,
}

impl ContentType {
    /// Whether items of this kind own child contents.
    pub fn has_children(&self) -> bool {
        matches!(self, ContentType::Collection | ContentType::Product)
    }
}

/// Skill level a content item targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentDifficulty {
    Beginner,
    Intermediate,
    Advanced,
    Unspecified,
}

/// An item of educational or media material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Unique identifier
    pub id: ContentId,
    /// Canonical URI of the item
    pub uri: String,
    /// Display name
    pub name: String,
    /// Plain-text description
    pub description: String,
    /// Release timestamp
    pub released_at: DateTime<Utc>,
    /// Available without a subscription
    pub free: bool,
    /// Requires a professional subscription
    pub professional: bool,
    /// Skill level
    pub difficulty: ContentDifficulty,
    /// Kind of item
    pub content_type: ContentType,
    /// Duration in seconds
    pub duration: i64,
    /// Hosted video identifier, for playable items
    pub video_identifier: Option<i64>,
    /// Artwork shown on cards
    pub card_artwork_url: Option<String>,
    /// Comma-separated technologies (e.g., "Swift 5, iOS 13, Xcode 11")
    pub technology_triple: String,
    /// Comma-separated contributor names
    pub contributors: String,
    /// Group this item belongs to (children of a collection)
    pub group_id: Option<GroupId>,
    /// Position inside the group
    pub ordinal: Option<i64>,
}

impl Content {
    /// Validate content data
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("name", "cannot be empty"));
        }

        if self.duration < 0 {
            return Err(self.invalid("duration", "cannot be negative"));
        }

        if matches!(self.ordinal, Some(ordinal) if ordinal < 0) {
            return Err(self.invalid("ordinal", "cannot be negative"));
        }

        Ok(())
    }

    fn invalid(&self, field: &str, problem: &str) -> LibraryError {
        LibraryError::InvalidInput {
            field: field.to_string(),
            message: format!("Content {} {} {}", self.id, field, problem),
        }
    }
}

// =============================================================================
// Relational Entities
// =============================================================================

/// Publication level of a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainLevel {
    Production,
    Beta,
    Blog,
    Retired,
    Archive,
}

/// A platform or subject area (e.g., "iOS & Swift")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub level: DomainLevel,
    pub ordinal: i64,
}

/// A topical category (e.g., "Networking")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub uri: String,
    pub ordinal: i64,
}

/// Association of a content item with a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDomain {
    pub content_id: ContentId,
    pub domain_id: DomainId,
}

/// Association of a content item with a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentCategory {
    pub content_id: ContentId,
    pub category_id: CategoryId,
}

/// A titled section of a collection's children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    /// The collection owning this group
    pub content_id: ContentId,
    pub name: String,
    pub description: Option<String>,
    pub ordinal: i64,
}

// =============================================================================
// User State
// =============================================================================

/// A user-set flag marking a content item for later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub content_id: ContentId,
    pub created_at: DateTime<Utc>,
}

/// A user's completion marker for a content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    pub id: i64,
    pub content_id: ContentId,
    /// Value at which the item counts as finished
    pub target: i64,
    /// Current value, in the same unit as `target`
    pub progress: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Progression {
    /// Completion ratio clamped to `0.0..=1.0`.
    pub fn percent_complete(&self) -> f64 {
        if self.target <= 0 {
            return 0.0;
        }
        (self.progress as f64 / self.target as f64).clamp(0.0, 1.0)
    }

    /// Whether the progress reached the target.
    pub fn finished(&self) -> bool {
        self.target > 0 && self.progress >= self.target
    }
}

// =============================================================================
// Downloads
// =============================================================================

/// Lifecycle of a local copy of content media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    Pending,
    Urgent,
    Enqueued,
    InProgress,
    Paused,
    Cancelled,
    Failed,
    Complete,
    Error,
}

impl DownloadState {
    /// Whether the download is waiting for or receiving data.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            DownloadState::Pending
                | DownloadState::Urgent
                | DownloadState::Enqueued
                | DownloadState::InProgress
        )
    }
}

/// Persistence-owned record of a content item's download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Download {
    pub id: Uuid,
    pub content_id: ContentId,
    pub requested_at: DateTime<Utc>,
    pub last_validated_at: Option<DateTime<Utc>>,
    pub file_name: Option<String>,
    pub remote_url: Option<String>,
    pub local_url: Option<String>,
    /// Fraction downloaded, `0.0..=1.0`
    pub progress: f64,
    pub state: DownloadState,
}

impl Download {
    /// Create a pending download request for a content item
    pub fn new(content_id: ContentId) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_id,
            requested_at: Utc::now(),
            last_validated_at: None,
            file_name: None,
            remote_url: None,
            local_url: None,
            progress: 0.0,
            state: DownloadState::Pending,
        }
    }

    /// Copy of this record at a new state and progress.
    pub fn with_progress(mut self, state: DownloadState, progress: f64) -> Self {
        self.state = state;
        self.progress = progress.clamp(0.0, 1.0);
        self
    }
}

// =============================================================================
// Projections
// =============================================================================

/// The cache's raw projection of one content item.
///
/// Domain and category references are unresolved ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedContentSummaryState {
    pub content: Content,
    pub content_domains: Vec<ContentDomain>,
    pub content_categories: Vec<ContentCategory>,
    pub parent_content: Option<Content>,
}

/// Presentation-ready summary of one content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSummaryState {
    pub content: Content,
    pub domains: Vec<Domain>,
    pub categories: Vec<Category>,
    pub parent_content: Option<Content>,
}

/// Children of a collection, grouped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildContentsState {
    pub parent_content_id: ContentId,
    pub groups: Vec<Group>,
    pub contents: Vec<Content>,
}

/// The cache's half of the dynamic state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDynamicContentState {
    pub progression: Option<Progression>,
    pub bookmark: Option<Bookmark>,
}

/// Merged mutable state of one content item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicContentState {
    pub download: Option<Download>,
    pub progression: Option<Progression>,
    pub bookmark: Option<Bookmark>,
}

impl DynamicContentState {
    pub fn new(cached: CachedDynamicContentState, download: Option<Download>) -> Self {
        Self {
            download,
            progression: cached.progression,
            bookmark: cached.bookmark,
        }
    }

    pub fn is_bookmarked(&self) -> bool {
        self.bookmark.is_some()
    }

    pub fn download_progress(&self) -> Option<f64> {
        self.download.as_ref().map(|download| download.progress)
    }
}

/// Snapshot of everything the cache holds about one content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPersistableState {
    pub content: Content,
    pub content_domains: Vec<ContentDomain>,
    pub content_categories: Vec<ContentCategory>,
    pub bookmark: Option<Bookmark>,
    pub parent_content: Option<Content>,
    pub progression: Option<Progression>,
    pub groups: Vec<Group>,
    pub child_contents: Vec<Content>,
}

// =============================================================================
// Cache Updates
// =============================================================================

/// A batch of entity changes to apply to the data cache.
///
/// Records are upserted by id. Deletions are keyed by content id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCacheUpdate {
    pub contents: Vec<Content>,
    pub bookmarks: Vec<Bookmark>,
    pub progressions: Vec<Progression>,
    pub content_domains: Vec<ContentDomain>,
    pub content_categories: Vec<ContentCategory>,
    pub groups: Vec<Group>,
    pub bookmark_deletion_content_ids: Vec<ContentId>,
    pub progression_deletion_content_ids: Vec<ContentId>,
}

impl DataCacheUpdate {
    pub fn with_contents(mut self, contents: Vec<Content>) -> Self {
        self.contents = contents;
        self
    }

    pub fn with_bookmarks(mut self, bookmarks: Vec<Bookmark>) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    pub fn with_progressions(mut self, progressions: Vec<Progression>) -> Self {
        self.progressions = progressions;
        self
    }

    pub fn with_content_domains(mut self, content_domains: Vec<ContentDomain>) -> Self {
        self.content_domains = content_domains;
        self
    }

    pub fn with_content_categories(mut self, content_categories: Vec<ContentCategory>) -> Self {
        self.content_categories = content_categories;
        self
    }

    pub fn with_groups(mut self, groups: Vec<Group>) -> Self {
        self.groups = groups;
        self
    }

    pub fn deleting_bookmarks(mut self, content_ids: Vec<ContentId>) -> Self {
        self.bookmark_deletion_content_ids = content_ids;
        self
    }

    pub fn deleting_progressions(mut self, content_ids: Vec<ContentId>) -> Self {
        self.progression_deletion_content_ids = content_ids;
        self
    }

    /// True when the update carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
            && self.bookmarks.is_empty()
            && self.progressions.is_empty()
            && self.content_domains.is_empty()
            && self.content_categories.is_empty()
            && self.groups.is_empty()
            && self.bookmark_deletion_content_ids.is_empty()
            && self.progression_deletion_content_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progression(progress: i64, target: i64) -> Progression {
        let now = Utc::now();
        Progression {
            id: 1,
            content_id: 42,
            target,
            progress,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_progression_percent_complete() {
        assert_eq!(progression(30, 120).percent_complete(), 0.25);
        assert_eq!(progression(500, 120).percent_complete(), 1.0);
        assert_eq!(progression(10, 0).percent_complete(), 0.0);
    }

    #[test]
    fn test_progression_finished() {
        assert!(progression(120, 120).finished());
        assert!(!progression(119, 120).finished());
        assert!(!progression(0, 0).finished());
    }

    #[test]
    fn test_download_progress_is_clamped() {
        let download = Download::new(42).with_progress(DownloadState::InProgress, 1.7);
        assert_eq!(download.progress, 1.0);
        assert!(download.state.is_active());
        assert!(!DownloadState::Complete.is_active());
    }

    #[test]
    fn test_dynamic_state_merges_both_halves() {
        let cached = CachedDynamicContentState {
            progression: Some(progression(10, 100)),
            bookmark: None,
        };
        let download = Download::new(42).with_progress(DownloadState::InProgress, 0.4);

        let state = DynamicContentState::new(cached, Some(download));
        assert!(!state.is_bookmarked());
        assert_eq!(state.download_progress(), Some(0.4));
        assert_eq!(state.progression.unwrap().progress, 10);
    }

    #[test]
    fn test_update_is_empty() {
        assert!(DataCacheUpdate::default().is_empty());
        assert!(!DataCacheUpdate::default()
            .deleting_bookmarks(vec![42])
            .is_empty());
    }

    fn content(id: ContentId) -> Content {
        Content {
            id,
            uri: format!("rw://betamax/videos/{id}"),
            name: "Networking with URLSession".to_string(),
            description: String::new(),
            released_at: Utc::now(),
            free: false,
            professional: false,
            difficulty: ContentDifficulty::Beginner,
            content_type: ContentType::Episode,
            duration: 300,
            video_identifier: None,
            card_artwork_url: None,
            technology_triple: String::new(),
            contributors: String::new(),
            group_id: None,
            ordinal: Some(0),
        }
    }

    #[test]
    fn test_content_validation_names_the_field() {
        assert!(content(1).validate().is_ok());

        let blank = Content {
            name: " ".to_string(),
            ..content(2)
        };
        assert!(matches!(
            blank.validate(),
            Err(LibraryError::InvalidInput { ref field, .. }) if field == "name"
        ));

        let negative = Content {
            ordinal: Some(-1),
            ..content(3)
        };
        let error = negative.validate().unwrap_err();
        assert_eq!(error.to_string(), "Invalid input: ordinal - Content 3 ordinal cannot be negative");
    }

    #[test]
    fn test_content_type_children() {
        assert!(ContentType::Collection.has_children());
        assert!(!ContentType::Episode.has_children());
    }
}
