//! # Collaborator Interfaces
//!
//! The repository composes two externally owned sources of truth:
//!
//! - [`DataCache`] - push-based derived store of content summaries and
//!   progression/bookmark state
//! - [`PersistenceStore`] - durable storage for domains, categories and
//!   per-item download records
//!
//! Both are injected as trait objects so hosts can supply their own storage
//! and tests can supply doubles. [`InMemoryDataCache`] and
//! [`InMemoryPersistenceStore`] are reference implementations without
//! eviction or schema.
//!
//! ## Streams
//!
//! Every subscription is a [`ContentStream`]: a boxed, `'static` stream of
//! `Result<T>`. An `Err` item is terminal. Dropping the stream cancels the
//! subscription.

pub mod cache;
pub mod persistence;

pub use cache::{CacheSnapshot, DataCache, InMemoryDataCache};
pub use persistence::{InMemoryPersistenceStore, PersistenceStore};

use crate::error::Result;
use core_async::BoxStream;

/// Fallible push subscription produced by the collaborators and the repository.
pub type ContentStream<T> = BoxStream<'static, Result<T>>;
