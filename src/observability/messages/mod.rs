// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for consistent, human-readable
//! output and [`StructuredLog`] to emit itself with typed fields at its own
//! level.
//!
//! # Organization
//!
//! * `stream` - Stream wrapper lifecycle events
//! * `network` - Pipeline network start, rewiring, completion and failure
//! * `transform` - Buffering transform turns and continuations
//!
//! # Usage Pattern
//!
//! ```rust
//! use streamwork::observability::messages::network::NetworkStarted;
//! use streamwork::observability::messages::StructuredLog;
//!
//! let msg = NetworkStarted {
//!     connections: 3,
//!     handles: 4,
//! };
//!
//! msg.log();
//! ```

pub mod network;
pub mod stream;
pub mod transform;

use tracing::Span;

/// A message that knows its own log level and structured fields.
pub trait StructuredLog {
    /// Emits the message as a `tracing` event.
    fn log(&self);

    /// Opens a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
