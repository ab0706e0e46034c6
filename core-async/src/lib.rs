//! Runtime abstraction layer for the content core.
//!
//! All core-* crates depend on this crate instead of reaching for tokio
//! directly, so the executor and the reactive plumbing are chosen in one
//! place.
//!
//! # Modules
//!
//! - `task`: Task spawning
//! - `sync`: Synchronization primitives (RwLock, broadcast and watch channels)
//! - `stream`: Reactive stream combinators (`combine_latest`, `dedup`,
//!   `watch_stream`) used to compose push-based subscriptions
//!
//! # Examples
//!
//! ```rust
//! use core_async::stream::{combine_latest, ReactiveStreamExt};
//! use futures::{stream, StreamExt};
//!
//! # async fn example() {
//! let left = stream::iter(vec![Ok::<_, ()>(1), Ok(1), Ok(2)]);
//! let right = stream::iter(vec![Ok::<_, ()>("x")]);
//!
//! let merged: Vec<_> = combine_latest(left, right).dedup().collect().await;
//! assert!(!merged.is_empty());
//! # }
//! ```

pub mod stream;
pub mod sync;
pub mod task;

// Re-export commonly used types at crate root for convenience
pub use stream::{combine_latest, watch_stream, BoxStream, ReactiveStreamExt};
pub use task::spawn;
