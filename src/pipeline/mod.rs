// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline networks.
//!
//! A [`PipelineNetwork`] connects sources, duplexes and sinks described by
//! [`Wiring`]s and propagates data, completion, backpressure and failure
//! between them. The adapters in this module expose a whole network as a
//! single source, sink or duplex so networks nest.

mod adapters;
mod network;
mod wiring;

#[cfg(test)]
mod integration_tests;

pub use adapters::{pipeline_sink, pipeline_source, pipeline_transform};
pub use network::{Connection, NetworkCallbacks, NetworkStream, PipelineNetwork};
pub use wiring::{create_linear, Wiring};
