// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for stream wrapper lifecycle events.

use crate::observability::messages::StructuredLog;
use crate::stream::LogLevel;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A sink lifecycle transition reported through a [`crate::stream::StreamLogger`].
///
/// # Log Level
/// Follows `level`: `debug!`, `info!` or `error!`
///
/// # Example
/// ```
/// use streamwork::observability::messages::stream::SinkLifecycle;
/// use streamwork::stream::LogLevel;
///
/// let msg = SinkLifecycle {
///     stream: "archive",
///     level: LogLevel::Info,
///     event: "write 3 chunks",
/// };
///
/// assert_eq!(msg.to_string(), "sink archive: write 3 chunks");
/// ```
pub struct SinkLifecycle<'a> {
    pub stream: &'a str,
    pub level: LogLevel,
    pub event: &'a str,
}

impl Display for SinkLifecycle<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "sink {}: {}", self.stream, self.event)
    }
}

impl StructuredLog for SinkLifecycle<'_> {
    fn log(&self) {
        match self.level {
            LogLevel::Debug => tracing::debug!(stream = self.stream, "{}", self),
            LogLevel::Info => tracing::info!(stream = self.stream, "{}", self),
            LogLevel::Error => tracing::error!(stream = self.stream, "{}", self),
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("sink", span_name = name, stream = self.stream)
    }
}
