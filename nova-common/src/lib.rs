//! # NOVA Common Library
//!
//! Shared code for the NOVA planning layer including:
//! - Error types
//! - Telemetry wire catalog, message bus and subscriber registry
//! - Bootstrap configuration loading
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{SubscriberRegistry, TelemetryBus, TelemetryEvent, TelemetryMessage};
