//! # Event Bus System
//!
//! Provides the observability hook of the content core using
//! `tokio::sync::broadcast`. Components publish typed events describing what
//! happened (cache updates, absorbed relational-lookup failures, table syncs,
//! failed subscriptions) and any number of subscribers can inspect them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   emit    ┌───────────┐  subscribe  ┌────────────┐
//! │ ContentRepository├──────────>│ EventBus  ├────────────>│ Subscriber │
//! └──────────────────┘           │ (broadcast│             └────────────┘
//! ┌──────────────────┐   emit    │  channel) │  subscribe  ┌────────────┐
//! │ RelationResolver ├──────────>│           ├────────────>│ Subscriber │
//! └──────────────────┘           └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Library(LibraryEvent::DomainsSynced { count: 3 }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Domain table synchronized");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped.
//!
//! Emitting with no subscribers returns `SendError`; publishers in the core
//! ignore it, an unobserved event is not a failure.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Cache and relational-data events
    Library(LibraryEvent),
    /// Lifecycle of read-side subscriptions
    Subscription(SubscriptionEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Library(e) => e.description(),
            CoreEvent::Subscription(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Subscription(SubscriptionEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Library(LibraryEvent::RelationResolutionFailed { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Library(LibraryEvent::DomainsSynced { .. })
            | CoreEvent::Library(LibraryEvent::CategoriesSynced { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Degraded but continuing
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Library Events
// ============================================================================

/// Events related to cache mutation and relational data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A cache update was forwarded to the data cache.
    CacheUpdated {
        /// Number of content records carried by the update.
        contents: usize,
        /// Number of bookmarks carried by the update.
        bookmarks: usize,
        /// Number of progressions carried by the update.
        progressions: usize,
    },
    /// A domain or category lookup failed and was replaced by an empty list.
    RelationResolutionFailed {
        /// Which relation failed ("domains" or "categories").
        relation: String,
        /// Ids that were requested.
        ids: Vec<i64>,
        /// Human-readable error message.
        message: String,
    },
    /// The durable domain table was overwritten.
    DomainsSynced {
        /// Number of domains now stored.
        count: usize,
    },
    /// The durable category table was overwritten.
    CategoriesSynced {
        /// Number of categories now stored.
        count: usize,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::CacheUpdated { .. } => "Cache update applied",
            LibraryEvent::RelationResolutionFailed { .. } => "Relational lookup failed",
            LibraryEvent::DomainsSynced { .. } => "Domain table synchronized",
            LibraryEvent::CategoriesSynced { .. } => "Category table synchronized",
        }
    }
}

// ============================================================================
// Subscription Events
// ============================================================================

/// Events related to read-side subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SubscriptionEvent {
    /// A subscription terminated because an upstream source failed.
    Failed {
        /// Query name (e.g., "content_dynamic_state").
        query: String,
        /// Content ids the query was issued for.
        content_ids: Vec<i64>,
        /// Human-readable error message.
        message: String,
    },
}

impl SubscriptionEvent {
    fn description(&self) -> &str {
        match self {
            SubscriptionEvent::Failed { .. } => "Subscription failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus yields another handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; [`CoreConfig`](crate::config::CoreConfig)
    /// validation rejects that value before a bus is built from it.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventSeverity, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let warnings = EventStream::new(event_bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without waiting.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn resolution_failure() -> CoreEvent {
        CoreEvent::Library(LibraryEvent::RelationResolutionFailed {
            relation: "domains".to_string(),
            ids: vec![1, 2],
            message: "store offline".to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);

        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        let event = CoreEvent::Library(LibraryEvent::DomainsSynced { count: 1 });

        assert!(bus.emit(event).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Library(LibraryEvent::CacheUpdated {
            contents: 3,
            bookmarks: 1,
            progressions: 0,
        });

        assert_eq!(bus.emit(event.clone()).unwrap(), 2);
        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| event.severity() >= EventSeverity::Warning);

        bus.emit(CoreEvent::Library(LibraryEvent::CategoriesSynced { count: 4 }))
            .ok();
        bus.emit(resolution_failure()).ok();

        let received = stream.recv().await.unwrap();
        assert_eq!(received, resolution_failure());
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());

        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_try_recv_skips_filtered_events() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Subscription(_)));

        bus.emit(resolution_failure()).ok();
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for count in 0..5 {
            bus.emit(CoreEvent::Library(LibraryEvent::DomainsSynced { count }))
                .ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(resolution_failure().severity(), EventSeverity::Warning);

        let failed = CoreEvent::Subscription(SubscriptionEvent::Failed {
            query: "content_dynamic_state".to_string(),
            content_ids: vec![42],
            message: "cache closed".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let synced = CoreEvent::Library(LibraryEvent::DomainsSynced { count: 2 });
        assert_eq!(synced.severity(), EventSeverity::Info);

        let updated = CoreEvent::Library(LibraryEvent::CacheUpdated {
            contents: 0,
            bookmarks: 1,
            progressions: 0,
        });
        assert_eq!(updated.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description() {
        assert_eq!(resolution_failure().description(), "Relational lookup failed");
    }

    #[test]
    fn test_event_serialization() {
        let event = resolution_failure();

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Library\""));
        assert!(json.contains("RelationResolutionFailed"));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
