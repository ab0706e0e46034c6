//! Fixture builders shared by the unit tests.

use chrono::{TimeZone, Utc};

use crate::models::{
    Bookmark, Category, CategoryId, Content, ContentDifficulty, ContentId, ContentType, Domain,
    DomainId, DomainLevel, Group, GroupId, Progression,
};

pub fn episode(id: ContentId) -> Content {
    Content {
        id,
        uri: format!("rw://betamax/videos/{id}"),
        name: format!("Episode {id}"),
        description: "Learn by doing.".to_string(),
        released_at: Utc.with_ymd_and_hms(2020, 1, 15, 9, 0, 0).unwrap(),
        free: false,
        professional: false,
        difficulty: ContentDifficulty::Intermediate,
        content_type: ContentType::Episode,
        duration: 600,
        video_identifier: Some(id * 10),
        card_artwork_url: None,
        technology_triple: "Swift 5, iOS 13, Xcode 11".to_string(),
        contributors: "Sam Davies".to_string(),
        group_id: None,
        ordinal: None,
    }
}

pub fn collection(id: ContentId) -> Content {
    Content {
        name: format!("Collection {id}"),
        content_type: ContentType::Collection,
        video_identifier: None,
        ..episode(id)
    }
}

pub fn content_in_group(id: ContentId, group_id: GroupId, ordinal: i64) -> Content {
    Content {
        group_id: Some(group_id),
        ordinal: Some(ordinal),
        ..episode(id)
    }
}

pub fn group(id: GroupId, content_id: ContentId, ordinal: i64) -> Group {
    Group {
        id,
        content_id,
        name: format!("Part {}", ordinal + 1),
        description: None,
        ordinal,
    }
}

pub fn domain(id: DomainId) -> Domain {
    Domain {
        id,
        name: format!("Domain {id}"),
        slug: format!("domain-{id}"),
        description: None,
        level: DomainLevel::Production,
        ordinal: id,
    }
}

pub fn category(id: CategoryId) -> Category {
    Category {
        id,
        name: format!("Category {id}"),
        uri: format!("rw://betamax/categories/{id}"),
        ordinal: id,
    }
}

pub fn bookmark(content_id: ContentId) -> Bookmark {
    Bookmark {
        id: content_id + 1000,
        content_id,
        created_at: Utc.with_ymd_and_hms(2020, 2, 1, 12, 0, 0).unwrap(),
    }
}

pub fn progression(content_id: ContentId, progress: i64, target: i64) -> Progression {
    let at = Utc.with_ymd_and_hms(2020, 2, 2, 12, 0, 0).unwrap();
    Progression {
        id: content_id + 2000,
        content_id,
        target,
        progress,
        created_at: at,
        updated_at: at,
    }
}
