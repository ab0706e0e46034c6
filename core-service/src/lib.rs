//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided collaborators (the data cache and the
//! persistence store) into the content core. Hosts without their own storage
//! can start from [`CoreDependencies::in_memory`].
//!
//! ```rust
//! use core_service::{CoreConfig, CoreDependencies, CoreService};
//!
//! let core = CoreService::new(CoreConfig::default(), CoreDependencies::in_memory())?;
//! let _summaries = core.repository().content_summary_state(42);
//! # Ok::<(), core_service::CoreError>(())
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_library::models;
pub use core_library::{
    ContentRepository, ContentStream, DataCache, InMemoryDataCache, InMemoryPersistenceStore,
    LibraryError, PersistenceStore,
};
pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{CoreEvent, EventBus, EventStream};
pub use core_runtime::logging::{init_logging, LoggingConfig};

use std::sync::Arc;

use tracing::info;

/// Collaborators the host supplies to the core.
#[derive(Default, Clone)]
pub struct CoreDependencies {
    pub data_cache: Option<Arc<dyn DataCache>>,
    pub persistence_store: Option<Arc<dyn PersistenceStore>>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit collaborator handles.
    pub fn new(data_cache: Arc<dyn DataCache>, persistence_store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            data_cache: Some(data_cache),
            persistence_store: Some(persistence_store),
        }
    }

    /// Bundle backed by the in-memory reference collaborators.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryDataCache::new()),
            Arc::new(InMemoryPersistenceStore::new()),
        )
    }

    pub fn with_data_cache(mut self, data_cache: Arc<dyn DataCache>) -> Self {
        self.data_cache = Some(data_cache);
        self
    }

    pub fn with_persistence_store(mut self, persistence_store: Arc<dyn PersistenceStore>) -> Self {
        self.persistence_store = Some(persistence_store);
        self
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    events: EventBus,
    repository: ContentRepository,
}

impl CoreService {
    /// Validate `config` and assemble the repository over `deps`.
    ///
    /// Logging is not installed here; hosts that want the core's subscriber
    /// call [`init_logging`] with `config.logging` themselves.
    pub fn new(config: CoreConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);

        let mut builder = ContentRepository::builder()
            .event_bus(events.clone())
            .report_resolution_failures(config.report_resolution_failures);
        if let Some(cache) = deps.data_cache {
            builder = builder.data_cache(cache);
        }
        if let Some(store) = deps.persistence_store {
            builder = builder.persistence_store(store);
        }

        let repository = builder.build().map_err(|err| match err {
            LibraryError::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            other => CoreError::Library(other),
        })?;

        info!(
            event_buffer_size = config.event_buffer_size,
            report_resolution_failures = config.report_resolution_failures,
            "Content core initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            events,
            repository,
        })
    }

    /// The content repository.
    pub fn repository(&self) -> &ContentRepository {
        &self.repository
    }

    /// Event bus shared by every component of this service.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to all core events.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}
