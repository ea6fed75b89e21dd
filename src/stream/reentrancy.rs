// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-flight bookkeeping for stream operations.
//!
//! Each wrapper owns one [`InFlight`] set. Entering an operation yields a
//! [`TurnGuard`] that clears the flag when it goes out of scope, so a flag is
//! set for exactly the dynamic extent of the operation, including the unwind
//! path of a panicking callback.

use std::cell::Cell;
use std::fmt;

/// Operations whose synchronous extent is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Next,
    End,
    Fail,
    Pause,
    Resume,
    Destroy,
    Write,
    Drain,
}

impl Operation {
    const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Next => "next",
            Operation::End => "end",
            Operation::Fail => "fail",
            Operation::Pause => "pause",
            Operation::Resume => "resume",
            Operation::Destroy => "destroy",
            Operation::Write => "write",
            Operation::Drain => "drain",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Default)]
pub struct InFlight {
    bits: Cell<u16>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, op: Operation) -> bool {
        self.bits.get() & op.bit() != 0
    }

    pub fn any(&self, ops: &[Operation]) -> bool {
        ops.iter().any(|op| self.contains(*op))
    }

    /// Marks `op` as in flight until the returned guard is dropped.
    ///
    /// Callers check [`InFlight::contains`] first; entering an operation that
    /// is already in flight is a wrapper bug.
    pub fn enter(&self, op: Operation) -> TurnGuard<'_> {
        debug_assert!(!self.contains(op), "{op} entered twice");
        self.bits.set(self.bits.get() | op.bit());
        TurnGuard { flags: self, op }
    }
}

#[must_use = "the operation is only in flight while the guard is alive"]
pub struct TurnGuard<'a> {
    flags: &'a InFlight,
    op: Operation,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let bits = self.flags.bits.get();
        self.flags.bits.set(bits & !self.op.bit());
    }
}
