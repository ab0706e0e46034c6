//! Umbrella crate for the content core.
//!
//! Host applications can depend on `content-core` and reach the whole content
//! state core through the `core-service` façade without wiring each workspace
//! crate individually.

pub use core_service::*;
