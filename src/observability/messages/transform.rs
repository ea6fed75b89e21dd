// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for buffering transform events.
//!
//! This module contains message types for logging events related to:
//! * Stage failures that fail the transform stream
//! * Deferred turns and their outcome
//! * Drain signaling after backpressure

use crate::errors::StreamError;
use crate::observability::messages::StructuredLog;
use crate::transform::TaskId;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A transform stage returned an error; the stream fails with it.
///
/// # Log Level
/// `warn!` - The failure is propagated to the stream's listener
///
/// # Example
/// ```
/// use streamwork::observability::messages::transform::StageFailed;
///
/// let error = anyhow::anyhow!("bad record");
/// let msg = StageFailed {
///     stage: "transform",
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct StageFailed<'a> {
    pub stage: &'a str,
    pub error: &'a anyhow::Error,
}

impl Display for StageFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Transform stage '{}' failed: {}", self.stage, self.error)
    }
}

impl StructuredLog for StageFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            stage = self.stage,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "stage_failed",
            span_name = name,
            stage = self.stage,
        )
    }
}

/// Buffered chunks remain after a turn; the rest runs in a deferred turn.
///
/// # Log Level
/// `debug!` - Detailed flow information
///
/// # Example
/// ```
/// use streamwork::observability::messages::transform::TurnDeferred;
///
/// let msg = TurnDeferred { buffered: 40, max_per_turn: 10 };
/// tracing::debug!("{}", msg);
/// ```
pub struct TurnDeferred {
    pub buffered: usize,
    pub max_per_turn: usize,
}

impl Display for TurnDeferred {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Deferring transform turn: {} chunks buffered, at most {} per turn",
            self.buffered, self.max_per_turn
        )
    }
}

impl StructuredLog for TurnDeferred {
    fn log(&self) {
        tracing::debug!(
            buffered = self.buffered,
            max_per_turn = self.max_per_turn,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "turn_deferred",
            span_name = name,
            buffered = self.buffered,
        )
    }
}

/// The buffer fell below the drain ceiling and the producer was told to resume.
///
/// # Log Level
/// `debug!` - Detailed flow information
pub struct DrainSignaled {
    pub buffered: usize,
}

impl Display for DrainSignaled {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Signaling drain with {} chunks buffered", self.buffered)
    }
}

impl StructuredLog for DrainSignaled {
    fn log(&self) {
        tracing::debug!(buffered = self.buffered, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("drain", span_name = name, buffered = self.buffered)
    }
}

/// A deferred continuation returned a contract violation with no caller
/// left to receive it.
///
/// # Log Level
/// `error!` - The violation is dropped after logging
pub struct ContinuationFailed<'a> {
    pub task: TaskId,
    pub error: &'a StreamError,
}

impl Display for ContinuationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Deferred continuation {} failed: {}", self.task, self.error)
    }
}

impl StructuredLog for ContinuationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            task = %self.task,
            kind = %self.error.kind(),
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "continuation_failed",
            span_name = name,
            task = %self.task,
        )
    }
}
