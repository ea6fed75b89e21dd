// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lifecycle-enforcing stream wrappers.
//!
//! A stream is created from a factory exactly once. The factory's opener
//! receives a guarded control handle (`SourceOutput`, `SinkControl`,
//! `DuplexOutput`) and returns the implementation; the caller of `open`
//! supplies a listener and gets back the guarded stream handle (`Source`,
//! `Sink`, `Duplex`). Every call in either direction is checked against the
//! stream's phase and in-flight operations before it is forwarded.
//!
//! Implementations and listeners take `&self`: callbacks re-enter the same
//! stream synchronously (pausing from inside `next`, writing from inside
//! `drain`), so state behind them lives in `Cell`/`RefCell` and no borrow may
//! be held across a call into a stream.

mod duplex;
mod logger;
pub mod reentrancy;
mod sink;
mod source;

pub use duplex::{
    Duplex, DuplexFactory, DuplexImpl, DuplexListener, DuplexOutput, DuplexPhase, InputPhase,
    OutputPhase,
};
pub use logger::{LogLevel, StreamLogger, TracingLogger};
pub use reentrancy::Operation;
pub use sink::{Sink, SinkControl, SinkFactory, SinkImpl, SinkListener, SinkPhase};
pub use source::{Source, SourceFactory, SourceImpl, SourceListener, SourceOutput, SourcePhase};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::StreamResult;

/// Identity of a stream factory. Networks deduplicate handles by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactoryId(u64);

impl FactoryId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FactoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Completion handed to a sink implementation's `finish`. Completing it
/// moves the stream to its finished phase and runs the caller's callback.
#[must_use = "a sink stays in its finishing phase until the completion is delivered"]
pub struct FinishCompletion {
    complete: Box<dyn FnOnce() -> StreamResult>,
}

impl FinishCompletion {
    pub(crate) fn new(complete: impl FnOnce() -> StreamResult + 'static) -> Self {
        Self {
            complete: Box::new(complete),
        }
    }

    pub fn complete(self) -> StreamResult {
        (self.complete)()
    }
}

impl fmt::Debug for FinishCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinishCompletion").finish_non_exhaustive()
    }
}

/// Caller-side callback run once a sink reports it has finished.
pub type DoneCallback = Box<dyn FnOnce() -> StreamResult>;
