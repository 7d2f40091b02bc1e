//! # Core Runtime Module
//!
//! Provides the ambient runtime infrastructure the playback engine is built on:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Nothing in this crate knows about the playback state machine itself. It
//! establishes the logging conventions, configuration validation and event
//! broadcasting used by `core-playback` and by hosts embedding it.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
