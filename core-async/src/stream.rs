//! Reactive stream combinators.
//!
//! Subscriptions in the content core are fallible push streams
//! (`Stream<Item = Result<T, E>>`). This module provides the few combinators
//! the core needs on top of `futures::StreamExt`:
//!
//! - [`combine_latest`]: recompute from the most recent value of two sources
//!   whenever either of them produces a new one
//! - [`Dedup`]: drop values equal to the immediately preceding one
//! - [`UntilError`]: deliver the first `Err`, then end the stream
//! - [`watch_stream`]: turn a `watch::Receiver` into a stream of snapshots
//!
//! ## Termination
//!
//! An `Err` from either side of a [`CombineLatest`] is delivered once and
//! ends the combined stream. The combined stream also ends when both sides
//! are exhausted, or when one side ends before ever producing a value (no
//! pair can be formed any more).
//!
//! ## Cancellation
//!
//! Combinators own their upstream streams. Dropping the combined stream drops
//! both sources, which in turn releases whatever subscription backs them.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{Fuse, FusedStream, Stream, StreamExt};
use tokio::sync::watch;

pub use futures::stream::BoxStream;

// ============================================================================
// Combine Latest
// ============================================================================

/// Stream returned by [`combine_latest`].
#[must_use = "streams do nothing unless polled"]
pub struct CombineLatest<A, B, L, R> {
    left: Fuse<A>,
    right: Fuse<B>,
    latest_left: Option<L>,
    latest_right: Option<R>,
    poll_left_first: bool,
    terminated: bool,
}

// The latest values are never pinned, only the (Unpin) sources are polled.
impl<A: Unpin, B: Unpin, L, R> Unpin for CombineLatest<A, B, L, R> {}

/// Combines two fallible streams into a stream of `(left, right)` pairs.
///
/// Nothing is emitted until both sides have produced a value. From then on,
/// every new value from either side is paired with the most recent value of
/// the other side.
///
/// Unlike a strict combine-latest, values that become ready on both sides
/// within the same poll are folded into a single emission: with `(1, 'a')`
/// already emitted and `2` and `'b'` both queued, the next item is
/// `(2, 'b')` and the intermediate pair is never produced. Consumers here
/// observe state, not events, so only the latest pair matters.
///
/// # Examples
///
/// ```rust
/// use core_async::stream::combine_latest;
/// use futures::{stream, StreamExt};
///
/// # async fn example() {
/// let left = stream::iter(vec![Ok::<_, ()>(1)]);
/// let right = stream::iter(vec![Ok::<_, ()>('a')]);
///
/// let pairs: Vec<_> = combine_latest(left, right).collect().await;
/// assert_eq!(pairs, vec![Ok((1, 'a'))]);
/// # }
/// ```
pub fn combine_latest<A, B, L, R, E>(left: A, right: B) -> CombineLatest<A, B, L, R>
where
    A: Stream<Item = Result<L, E>> + Unpin,
    B: Stream<Item = Result<R, E>> + Unpin,
    L: Clone,
    R: Clone,
{
    CombineLatest {
        left: left.fuse(),
        right: right.fuse(),
        latest_left: None,
        latest_right: None,
        poll_left_first: true,
        terminated: false,
    }
}

/// Outcome of polling one side of a [`CombineLatest`].
enum SideOutcome<E> {
    Updated,
    Failed(E),
    Exhausted { had_value: bool },
    Idle,
}

impl<A, B, L, R> CombineLatest<A, B, L, R> {
    fn current_pair(&self) -> Option<(L, R)>
    where
        L: Clone,
        R: Clone,
    {
        match (&self.latest_left, &self.latest_right) {
            (Some(left), Some(right)) => Some((left.clone(), right.clone())),
            _ => None,
        }
    }
}

fn poll_side<S, T, E>(
    side: &mut Fuse<S>,
    latest: &mut Option<T>,
    cx: &mut Context<'_>,
) -> SideOutcome<E>
where
    S: Stream<Item = Result<T, E>> + Unpin,
{
    if side.is_done() {
        return SideOutcome::Idle;
    }

    match side.poll_next_unpin(cx) {
        Poll::Ready(Some(Ok(value))) => {
            *latest = Some(value);
            SideOutcome::Updated
        }
        Poll::Ready(Some(Err(err))) => SideOutcome::Failed(err),
        Poll::Ready(None) => SideOutcome::Exhausted {
            had_value: latest.is_some(),
        },
        Poll::Pending => SideOutcome::Idle,
    }
}

impl<A, B, L, R, E> Stream for CombineLatest<A, B, L, R>
where
    A: Stream<Item = Result<L, E>> + Unpin,
    B: Stream<Item = Result<R, E>> + Unpin,
    L: Clone,
    R: Clone,
{
    type Item = Result<(L, R), E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.terminated {
            return Poll::Ready(None);
        }

        // Alternate which side is polled first so a chatty source cannot
        // starve the other one.
        let left_first = this.poll_left_first;
        this.poll_left_first = !left_first;

        loop {
            let mut updated = false;

            for poll_left in [left_first, !left_first] {
                let outcome = if poll_left {
                    poll_side(&mut this.left, &mut this.latest_left, cx)
                } else {
                    poll_side(&mut this.right, &mut this.latest_right, cx)
                };

                match outcome {
                    SideOutcome::Updated => updated = true,
                    SideOutcome::Failed(err) => {
                        this.terminated = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                    SideOutcome::Exhausted { had_value: false } => {
                        this.terminated = true;
                        return Poll::Ready(None);
                    }
                    SideOutcome::Exhausted { had_value: true } | SideOutcome::Idle => {}
                }
            }

            if updated {
                if let Some(pair) = this.current_pair() {
                    return Poll::Ready(Some(Ok(pair)));
                }
                // One side is still waiting for its first value; keep draining.
                continue;
            }

            if this.left.is_done() && this.right.is_done() {
                this.terminated = true;
                return Poll::Ready(None);
            }

            return Poll::Pending;
        }
    }
}

impl<A, B, L, R, E> FusedStream for CombineLatest<A, B, L, R>
where
    A: Stream<Item = Result<L, E>> + Unpin,
    B: Stream<Item = Result<R, E>> + Unpin,
    L: Clone,
    R: Clone,
{
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

// ============================================================================
// Dedup
// ============================================================================

/// Stream returned by [`ReactiveStreamExt::dedup`].
///
/// Forwards `Ok` values only when they differ from the previously forwarded
/// value. Errors are always forwarded and do not reset the comparison.
#[must_use = "streams do nothing unless polled"]
pub struct Dedup<S, T> {
    stream: S,
    last: Option<T>,
}

impl<S: Unpin, T> Unpin for Dedup<S, T> {}

impl<S, T, E> Stream for Dedup<S, T>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    T: PartialEq + Clone,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            match this.stream.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(value))) => {
                    if this.last.as_ref() == Some(&value) {
                        continue;
                    }
                    this.last = Some(value.clone());
                    return Poll::Ready(Some(Ok(value)));
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

// ============================================================================
// Until Error
// ============================================================================

/// Stream returned by [`ReactiveStreamExt::until_error`].
#[must_use = "streams do nothing unless polled"]
pub struct UntilError<S> {
    stream: S,
    terminated: bool,
}

impl<S, T, E> Stream for UntilError<S>
where
    S: Stream<Item = Result<T, E>> + Unpin,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.terminated {
            return Poll::Ready(None);
        }

        match this.stream.poll_next_unpin(cx) {
            Poll::Ready(Some(Err(err))) => {
                this.terminated = true;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.terminated = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl<S, T, E> FusedStream for UntilError<S>
where
    S: Stream<Item = Result<T, E>> + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

// ============================================================================
// Extension Trait
// ============================================================================

/// Method-call syntax for the reactive combinators.
pub trait ReactiveStreamExt: Stream {
    /// See [`combine_latest`].
    fn combine_latest<B, L, R, E>(self, other: B) -> CombineLatest<Self, B, L, R>
    where
        Self: Stream<Item = Result<L, E>> + Sized + Unpin,
        B: Stream<Item = Result<R, E>> + Unpin,
        L: Clone,
        R: Clone,
    {
        combine_latest(self, other)
    }

    /// Suppresses consecutive equal `Ok` values.
    fn dedup<T, E>(self) -> Dedup<Self, T>
    where
        Self: Stream<Item = Result<T, E>> + Sized + Unpin,
        T: PartialEq + Clone,
    {
        Dedup {
            stream: self,
            last: None,
        }
    }

    /// Makes the first `Err` terminal: it is delivered, then the stream ends
    /// and the upstream is no longer polled.
    fn until_error<T, E>(self) -> UntilError<Self>
    where
        Self: Stream<Item = Result<T, E>> + Sized + Unpin,
    {
        UntilError {
            stream: self,
            terminated: false,
        }
    }
}

impl<S: Stream + ?Sized> ReactiveStreamExt for S {}

// ============================================================================
// Watch Adapter
// ============================================================================

/// Streams the current value of a `watch` channel, then every later change.
///
/// The stream ends when the sender is dropped. Changes published faster than
/// the subscriber polls are coalesced into the latest snapshot.
pub fn watch_stream<T>(receiver: watch::Receiver<T>) -> BoxStream<'static, T>
where
    T: Clone + Send + Sync + 'static,
{
    futures::stream::unfold((receiver, true), |(mut receiver, first)| async move {
        if !first && receiver.changed().await.is_err() {
            return None;
        }
        let value = receiver.borrow_and_update().clone();
        Some((value, (receiver, false)))
    })
    .boxed()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use futures::{stream, FutureExt};

    type Item<T> = Result<T, &'static str>;

    #[tokio::test]
    async fn test_combine_latest_waits_for_both_sides() {
        let (left_tx, left_rx) = mpsc::unbounded::<Item<i32>>();
        let (right_tx, right_rx) = mpsc::unbounded::<Item<char>>();
        let mut combined = combine_latest(left_rx, right_rx);

        left_tx.unbounded_send(Ok(1)).unwrap();
        left_tx.unbounded_send(Ok(2)).unwrap();
        assert!(combined.next().now_or_never().is_none());

        right_tx.unbounded_send(Ok('a')).unwrap();
        assert_eq!(combined.next().await, Some(Ok((2, 'a'))));
    }

    #[tokio::test]
    async fn test_combine_latest_recombines_on_either_side() {
        let (left_tx, left_rx) = mpsc::unbounded::<Item<i32>>();
        let (right_tx, right_rx) = mpsc::unbounded::<Item<char>>();
        let mut combined = combine_latest(left_rx, right_rx);

        left_tx.unbounded_send(Ok(1)).unwrap();
        right_tx.unbounded_send(Ok('a')).unwrap();
        assert_eq!(combined.next().await, Some(Ok((1, 'a'))));

        right_tx.unbounded_send(Ok('b')).unwrap();
        assert_eq!(combined.next().await, Some(Ok((1, 'b'))));

        left_tx.unbounded_send(Ok(5)).unwrap();
        assert_eq!(combined.next().await, Some(Ok((5, 'b'))));
    }

    #[tokio::test]
    async fn test_combine_latest_error_is_terminal() {
        let (left_tx, left_rx) = mpsc::unbounded::<Item<i32>>();
        let (right_tx, right_rx) = mpsc::unbounded::<Item<char>>();
        let mut combined = combine_latest(left_rx, right_rx);

        left_tx.unbounded_send(Ok(1)).unwrap();
        right_tx.unbounded_send(Ok('a')).unwrap();
        assert_eq!(combined.next().await, Some(Ok((1, 'a'))));

        right_tx.unbounded_send(Err("store offline")).unwrap();
        assert_eq!(combined.next().await, Some(Err("store offline")));

        // Further upstream values are never observed
        left_tx.unbounded_send(Ok(2)).unwrap();
        assert_eq!(combined.next().await, None);
        assert!(combined.is_terminated());
    }

    #[tokio::test]
    async fn test_combine_latest_ends_when_side_ends_without_value() {
        let left = stream::iter(Vec::<Item<i32>>::new());
        let (_right_tx, right_rx) = mpsc::unbounded::<Item<char>>();

        let mut combined = combine_latest(left, right_rx);
        assert_eq!(combined.next().await, None);
    }

    #[tokio::test]
    async fn test_combine_latest_keeps_last_value_of_finished_side() {
        let left = stream::iter(vec![Ok::<_, &'static str>(7)]);
        let (right_tx, right_rx) = mpsc::unbounded::<Item<char>>();
        let mut combined = combine_latest(left, right_rx);

        right_tx.unbounded_send(Ok('a')).unwrap();
        assert_eq!(combined.next().await, Some(Ok((7, 'a'))));

        right_tx.unbounded_send(Ok('b')).unwrap();
        assert_eq!(combined.next().await, Some(Ok((7, 'b'))));

        drop(right_tx);
        assert_eq!(combined.next().await, None);
    }

    #[tokio::test]
    async fn test_combine_latest_folds_values_ready_on_both_sides() {
        let (left_tx, left_rx) = mpsc::unbounded::<Item<i32>>();
        let (right_tx, right_rx) = mpsc::unbounded::<Item<char>>();
        let mut combined = combine_latest(left_rx, right_rx);

        left_tx.unbounded_send(Ok(1)).unwrap();
        right_tx.unbounded_send(Ok('a')).unwrap();
        assert_eq!(combined.next().await, Some(Ok((1, 'a'))));

        left_tx.unbounded_send(Ok(2)).unwrap();
        right_tx.unbounded_send(Ok('b')).unwrap();
        assert_eq!(combined.next().await, Some(Ok((2, 'b'))));
        assert!(combined.next().now_or_never().is_none());
    }

    #[tokio::test]
    async fn test_dropping_combined_stream_cancels_both_sources() {
        let (left_tx, left_rx) = mpsc::unbounded::<Item<i32>>();
        let (right_tx, right_rx) = mpsc::unbounded::<Item<char>>();
        let combined = combine_latest(left_rx, right_rx).dedup();

        assert!(!left_tx.is_closed());
        assert!(!right_tx.is_closed());

        drop(combined);

        assert!(left_tx.is_closed());
        assert!(right_tx.is_closed());
    }

    #[tokio::test]
    async fn test_dedup_suppresses_consecutive_duplicates() {
        let source = stream::iter(vec![
            Ok::<_, &'static str>(1),
            Ok(1),
            Ok(2),
            Ok(2),
            Ok(1),
        ]);

        let values: Vec<_> = source.dedup().collect().await;
        assert_eq!(values, vec![Ok(1), Ok(2), Ok(1)]);
    }

    #[tokio::test]
    async fn test_dedup_forwards_errors() {
        let source = stream::iter(vec![Ok(1), Err("boom"), Ok(1), Ok(3)]);

        let values: Vec<_> = source.dedup().collect().await;
        assert_eq!(values, vec![Ok(1), Err("boom"), Ok(3)]);
    }

    #[tokio::test]
    async fn test_combine_then_dedup_emits_only_transitions() {
        let (a_tx, a_rx) = mpsc::unbounded::<Item<i32>>();
        let (b_tx, b_rx) = mpsc::unbounded::<Item<char>>();
        let mut merged = a_rx.combine_latest(b_rx).dedup();

        a_tx.unbounded_send(Ok(1)).unwrap();
        b_tx.unbounded_send(Ok('x')).unwrap();
        assert_eq!(merged.next().await, Some(Ok((1, 'x'))));

        a_tx.unbounded_send(Ok(1)).unwrap();
        b_tx.unbounded_send(Ok('x')).unwrap();
        a_tx.unbounded_send(Ok(2)).unwrap();
        b_tx.unbounded_send(Ok('x')).unwrap();
        drop(a_tx);
        drop(b_tx);

        let rest: Vec<_> = merged.collect().await;
        assert_eq!(rest, vec![Ok((2, 'x'))]);
    }

    #[tokio::test]
    async fn test_until_error_ends_after_first_error() {
        let source = stream::iter(vec![Ok(1), Err("miss"), Ok(2)]);

        let values: Vec<_> = source.until_error().collect().await;
        assert_eq!(values, vec![Ok(1), Err("miss")]);
    }

    #[tokio::test]
    async fn test_watch_stream_yields_current_then_changes() {
        let (tx, rx) = watch::channel(1);
        let mut values = watch_stream(rx);

        assert_eq!(values.next().await, Some(1));

        tx.send(2).unwrap();
        assert_eq!(values.next().await, Some(2));

        drop(tx);
        assert_eq!(values.next().await, None);
    }
}
