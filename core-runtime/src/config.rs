//! # Core Configuration Module
//!
//! Provides configuration management for the content core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance. Validation is fail-fast: `build()` rejects out-of-range values
//! with an actionable message instead of letting the event bus or the
//! logging layer fail later.
//!
//! Collaborators (the data cache and the persistence store) are not part of
//! this configuration; they are injected where the repository is assembled.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::config::CoreConfig;
//! use core_runtime::logging::{LogLevel, LoggingConfig};
//!
//! let config = CoreConfig::builder()
//!     .event_buffer_size(256)
//!     .logging(LoggingConfig::default().with_level(LogLevel::Debug))
//!     .build()?;
//!
//! assert_eq!(config.event_buffer_size, 256);
//! # Ok::<(), core_runtime::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use core_runtime::config::CoreConfig;
//!
//! let result = CoreConfig::builder().event_buffer_size(0).build();
//! assert!(result.is_err());
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::LoggingConfig;

/// Upper bound for the event bus buffer.
pub const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration for the content core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    /// Logging setup applied by hosts that let the core install a subscriber
    pub logging: LoggingConfig,

    /// Publish `RelationResolutionFailed` events in addition to logging them
    pub report_resolution_failures: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            logging: LoggingConfig::default(),
            report_resolution_failures: true,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Event buffer size is > 0 and <= [`MAX_EVENT_BUFFER_SIZE`]
    /// - A custom log filter, when present, is not blank
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size {} exceeds maximum of {}",
                self.event_buffer_size, MAX_EVENT_BUFFER_SIZE
            )));
        }

        if let Some(filter) = &self.logging.filter {
            if filter.trim().is_empty() {
                return Err(Error::Config(
                    "Log filter cannot be blank. Omit .with_filter() to use the default."
                        .to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    event_buffer_size: Option<usize>,
    logging: Option<LoggingConfig>,
    report_resolution_failures: Option<bool>,
}

impl CoreConfigBuilder {
    /// Sets the event bus capacity.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the logging configuration.
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Enables or disables publishing of relational-lookup failures.
    ///
    /// Failures are always logged; this only controls the event bus.
    pub fn report_resolution_failures(mut self, enabled: bool) -> Self {
        self.report_resolution_failures = Some(enabled);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<CoreConfig> {
        let defaults = CoreConfig::default();

        let config = CoreConfig {
            event_buffer_size: self.event_buffer_size.unwrap_or(defaults.event_buffer_size),
            logging: self.logging.unwrap_or(defaults.logging),
            report_resolution_failures: self
                .report_resolution_failures
                .unwrap_or(defaults.report_resolution_failures),
        };

        config.validate()?;

        Ok(config)
    }
}
