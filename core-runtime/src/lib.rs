//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the console's session core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the auth and service crates
//! depend on. It establishes the logging conventions, the fail-fast
//! configuration builder and the event broadcasting used throughout the
//! workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, SessionConfig};
pub use error::{Error, Result};
pub use events::{AuthEvent, CoreEvent, EventBus, EventStream, SessionEvent};
