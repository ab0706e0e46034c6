//! Task spawning.
//!
//! Producers that feed the reactive sources (cache writers, download
//! progress reporters) run as independent tasks. They may land on any worker
//! thread, so spawned futures must be `Send`.
//!
//! ```rust
//! use core_async::sync::watch;
//! use core_async::task;
//!
//! # async fn example() {
//! let (progress, mut observer) = watch::channel(0.0_f64);
//! let reporter = task::spawn(async move {
//!     progress.send_replace(0.5);
//! });
//!
//! reporter.await.unwrap();
//! assert_eq!(*observer.borrow_and_update(), 0.5);
//! # }
//! ```

pub use tokio::task::{JoinError, JoinHandle};

/// Spawn `future` on the ambient Tokio runtime.
///
/// Dropping the returned handle detaches the task; awaiting it yields the
/// output or the [`JoinError`] of a panicked or aborted task.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}
