// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Contract violations raised by stream wrappers and the pipeline network.
//!
//! Every violation carries an [`ErrorKind`]. Callers distinguish kinds through
//! [`StreamError::kind`] or [`StreamError::is`]; the human-readable message is
//! for diagnostics only and never participates in matching.

use std::fmt;
use thiserror::Error;

/// Result alias used by every stream operation and callback.
pub type StreamResult<T = ()> = Result<T, StreamError>;

/// Named violation kinds.
///
/// `Usage` groups programming errors (empty batch, end before resume, ...)
/// that callers are not expected to recover from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AlreadyDestroyed,
    AlreadyFailed,
    AlreadyEnded,
    AlreadyOpened,
    AlreadyPaused,
    NotPaused,
    AlreadyFinishing,
    AlreadyFinished,
    Reentrancy,
    ResumeDuringNext,
    CallbackDuringPause,
    DrainDuringWrite,
    DuplexLoop,
    Usage(UsageFault),
}

impl ErrorKind {
    /// Diagnostic name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::AlreadyDestroyed => "StreamAlreadyDestroyedError",
            ErrorKind::AlreadyFailed => "StreamAlreadyFailedError",
            ErrorKind::AlreadyEnded => "StreamAlreadyEndedError",
            ErrorKind::AlreadyOpened => "StreamAlreadyOpenedError",
            ErrorKind::AlreadyPaused => "StreamAlreadyPausedError",
            ErrorKind::NotPaused => "StreamNotPausedError",
            ErrorKind::AlreadyFinishing => "StreamAlreadyFinishingError",
            ErrorKind::AlreadyFinished => "StreamAlreadyFinishedError",
            ErrorKind::Reentrancy => "StreamReentrancyError",
            ErrorKind::ResumeDuringNext => "StreamResumeDuringNextError",
            ErrorKind::CallbackDuringPause => "StreamCallbackDuringPauseError",
            ErrorKind::DrainDuringWrite => "StreamDrainDuringWriteError",
            ErrorKind::DuplexLoop => "StreamDuplexLoopError",
            ErrorKind::Usage(_) => "StreamUsageError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Programming errors that have no named kind of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum UsageFault {
    #[error("cannot emit an empty chunk batch")]
    EmptyBatch,
    #[error("stream has never been resumed")]
    NeverResumed,
    #[error("logger already attached")]
    LoggerAlreadyAttached,
    #[error("pipeline network already started")]
    NetworkAlreadyStarted,
    #[error("completion already delivered")]
    AlreadyCompleted,
}

/// A contract violation, raised synchronously at the violating call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {operation}: {message}")]
pub struct StreamError {
    kind: ErrorKind,
    operation: &'static str,
    message: String,
}

impl StreamError {
    pub fn new(kind: ErrorKind, operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            operation,
            message: message.into(),
        }
    }

    pub fn usage(fault: UsageFault, operation: &'static str) -> Self {
        Self::new(ErrorKind::Usage(fault), operation, fault.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Membership test against the registry. This is the only supported way
    /// to tell violation kinds apart.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// True for any `Usage` fault regardless of its detail.
    pub fn is_usage(&self) -> bool {
        matches!(self.kind, ErrorKind::Usage(_))
    }

    /// Operation that raised the violation (`"next"`, `"write"`, ...).
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
