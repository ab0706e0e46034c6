//! # Content Library
//!
//! Reactive access to content state for presentation layers.
//!
//! ## Overview
//!
//! This crate provides:
//! - The content data model (contents, groups, domains, categories, user state)
//! - The [`DataCache`] and [`PersistenceStore`] collaborator interfaces, with
//!   in-memory implementations
//! - [`ContentRepository`], which merges both collaborators into push-based
//!   subscriptions and resolves relational references

pub mod error;
pub mod models;
pub mod repository;
pub mod resolver;
pub mod sources;

#[cfg(test)]
mod testing;

pub use error::{LibraryError, Result};
pub use repository::{ContentRepository, ContentRepositoryBuilder};
pub use resolver::RelationResolver;
pub use sources::{
    CacheSnapshot, ContentStream, DataCache, InMemoryDataCache, InMemoryPersistenceStore,
    PersistenceStore,
};
