// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::StreamResult;
use crate::pipeline::PipelineNetwork;
use crate::stream::{DuplexFactory, SinkFactory, SourceFactory};

/// A path through the network: a source, zero or more duplexes, a sink.
pub struct Wiring<T> {
    pub from: SourceFactory<T>,
    pub via: Vec<DuplexFactory<T, T>>,
    pub to: SinkFactory<T>,
}

impl<T> Clone for Wiring<T> {
    fn clone(&self) -> Self {
        Self {
            from: self.from.clone(),
            via: self.via.clone(),
            to: self.to.clone(),
        }
    }
}

impl<T: 'static> Wiring<T> {
    /// Direct connection from `from` to `to`.
    pub fn new(from: SourceFactory<T>, to: SinkFactory<T>) -> Self {
        Self {
            from,
            via: Vec::new(),
            to,
        }
    }

    /// Appends a duplex in front of the sink.
    pub fn via(mut self, duplex: DuplexFactory<T, T>) -> Self {
        self.via.push(duplex);
        self
    }
}

/// Builds a network holding the single wiring `from -> via... -> to`.
pub fn create_linear<T: Clone + 'static>(
    from: SourceFactory<T>,
    via: Vec<DuplexFactory<T, T>>,
    to: SinkFactory<T>,
) -> StreamResult<PipelineNetwork<T>> {
    let network = PipelineNetwork::new();
    network.rewire(vec![Wiring { from, via, to }])?;
    Ok(network)
}
