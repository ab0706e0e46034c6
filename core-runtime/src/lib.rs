//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the content core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system used as the observability hook
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions and event broadcasting mechanisms
//! used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
