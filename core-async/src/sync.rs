//! Synchronization primitives.
//!
//! Re-exports the async-aware `tokio::sync` primitives. Everything here is
//! `Send + Sync` and never blocks the executor while waiting.
//!
//! `watch` is the backbone of the in-memory collaborators: a sender holds the
//! latest snapshot and every subscription gets its own receiver.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{watch, RwLock};
//!
//! async fn example() {
//!     let rwlock = RwLock::new(vec![1, 2, 3]);
//!     let read_guard = rwlock.read().await;
//!     println!("Length: {}", read_guard.len());
//!
//!     let (tx, rx) = watch::channel(0);
//!     tx.send_modify(|value| *value += 1);
//!     assert_eq!(*rx.borrow(), 1);
//! }
//! ```

pub use tokio::sync::{broadcast, watch, RwLock};
