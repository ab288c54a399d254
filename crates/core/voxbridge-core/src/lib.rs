//! Core types for VoxBridge
//!
//! Shared error type and the parsed configuration snapshot consumed by the
//! TTS provider crate. Configuration loading from disk is the host
//! application's job; this crate only defines the shapes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;

pub use config::*;
pub use error::{Result, VoxError};
