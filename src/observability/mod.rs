// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for the diagnostic and
//! operational logging of streamwork. Message types follow a struct-based
//! pattern with a `Display` implementation so that log text lives in one
//! place and every event carries structured fields.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::stream` - Sink lifecycle events reported by the tracing logger
//! * `messages::network` - Pipeline network start, completion and teardown
//! * `messages::transform` - Buffering transform turns, drains and stage failures
//!
//! # Usage
//!
//! ```rust
//! use streamwork::observability::messages::transform::TurnDeferred;
//!
//! let msg = TurnDeferred {
//!     buffered: 40,
//!     max_per_turn: 10,
//! };
//!
//! tracing::debug!("{}", msg);
//! ```

pub mod messages;
