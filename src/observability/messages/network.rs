// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline network lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Network start and rewiring
//! * Overall completion
//! * Failure handling and teardown

use crate::observability::messages::StructuredLog;
use crate::stream::FactoryId;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Network started with its initial wiring applied.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use streamwork::observability::messages::network::NetworkStarted;
///
/// let msg = NetworkStarted {
///     connections: 3,
///     handles: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct NetworkStarted {
    pub connections: usize,
    pub handles: usize,
}

impl Display for NetworkStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline network started: {} connections across {} streams",
            self.connections, self.handles
        )
    }
}

impl StructuredLog for NetworkStarted {
    fn log(&self) {
        tracing::info!(
            connections = self.connections,
            handles = self.handles,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "network",
            span_name = name,
            connections = self.connections,
            handles = self.handles,
        )
    }
}

/// Connections were replaced and unreferenced streams retired.
///
/// # Log Level
/// `debug!` - Detailed flow information
pub struct NetworkRewired {
    pub connections: usize,
    pub retired: usize,
}

impl Display for NetworkRewired {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline network rewired: {} connections, {} streams retired",
            self.connections, self.retired
        )
    }
}

impl StructuredLog for NetworkRewired {
    fn log(&self) {
        tracing::debug!(
            connections = self.connections,
            retired = self.retired,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "rewire",
            span_name = name,
            connections = self.connections,
        )
    }
}

/// Every sink of the network has finished.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NetworkCompleted {
    pub sinks: usize,
}

impl Display for NetworkCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Pipeline network completed: {} sinks finished", self.sinks)
    }
}

impl StructuredLog for NetworkCompleted {
    fn log(&self) {
        tracing::info!(sinks = self.sinks, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("network_completed", span_name = name, sinks = self.sinks)
    }
}

/// A stream failed; the network tears down its remaining streams.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use streamwork::observability::messages::network::NetworkFailed;
/// use streamwork::stream::SourceFactory;
///
/// # struct Idle;
/// # impl streamwork::stream::SourceImpl for Idle {
/// #     fn resume(&self) -> streamwork::errors::StreamResult { Ok(()) }
/// # }
/// let factory: SourceFactory<u8> = SourceFactory::new(|_output| Idle);
/// let error = anyhow::anyhow!("connection reset");
/// let msg = NetworkFailed {
///     stream: factory.id(),
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct NetworkFailed<'a> {
    pub stream: FactoryId,
    pub error: &'a anyhow::Error,
}

impl Display for NetworkFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline network failed: stream {} reported: {}",
            self.stream, self.error
        )
    }
}

impl StructuredLog for NetworkFailed<'_> {
    fn log(&self) {
        tracing::error!(
            stream = %self.stream,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "network_failed",
            span_name = name,
            stream = %self.stream,
        )
    }
}

/// A failure arrived after the network had already failed or was destroyed.
///
/// # Log Level
/// `warn!` - The failure is dropped
pub struct FailureDropped<'a> {
    pub stream: FactoryId,
    pub error: &'a anyhow::Error,
}

impl Display for FailureDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dropping failure of stream {} after network shutdown: {}",
            self.stream, self.error
        )
    }
}

impl StructuredLog for FailureDropped<'_> {
    fn log(&self) {
        tracing::warn!(
            stream = %self.stream,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("failure_dropped", span_name = name, stream = %self.stream)
    }
}

/// The network was destroyed by its owner.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NetworkDestroyed {
    pub handles: usize,
}

impl Display for NetworkDestroyed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Pipeline network destroyed: releasing {} streams", self.handles)
    }
}

impl StructuredLog for NetworkDestroyed {
    fn log(&self) {
        tracing::info!(handles = self.handles, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("network_destroyed", span_name = name, handles = self.handles)
    }
}
