// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pluggable lifecycle logger for sink streams.

use std::fmt;

use crate::observability::messages::stream::SinkLifecycle;
use crate::observability::messages::StructuredLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => f.write_str("DEBUG"),
            LogLevel::Info => f.write_str("INFO"),
            LogLevel::Error => f.write_str("ERROR"),
        }
    }
}

/// Observer for sink lifecycle transitions. Purely observational: a logger
/// never influences control flow.
pub trait StreamLogger {
    fn log(&self, level: LogLevel, message: &str);
}

impl<F> StreamLogger for F
where
    F: Fn(LogLevel, &str),
{
    fn log(&self, level: LogLevel, message: &str) {
        self(level, message)
    }
}

/// Forwards lifecycle events to `tracing`, tagged with a stream name.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    name: String,
}

impl TracingLogger {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl StreamLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        SinkLifecycle {
            stream: &self.name,
            level,
            event: message,
        }
        .log();
    }
}
