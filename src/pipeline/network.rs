// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::errors::{ErrorKind, StreamError, StreamResult, UsageFault};
use crate::observability::messages::network::{
    FailureDropped, NetworkCompleted, NetworkDestroyed, NetworkFailed, NetworkRewired, NetworkStarted,
};
use crate::observability::messages::StructuredLog;
use crate::pipeline::Wiring;
use crate::stream::{
    Duplex, DuplexFactory, DuplexListener, DuplexPhase, FactoryId, InputPhase, Operation, OutputPhase,
    Sink, SinkFactory, SinkListener, Source, SourceFactory, SourceListener,
};

const DESTROY_REASON: &str = "pipeline network destroyed";

/// Callbacks a started network reports its outcome through. Exactly one of
/// them runs, at most once.
pub struct NetworkCallbacks {
    done: Box<dyn FnOnce() -> StreamResult>,
    failed: Box<dyn FnOnce(anyhow::Error) -> StreamResult>,
}

impl NetworkCallbacks {
    pub fn new(
        done: impl FnOnce() -> StreamResult + 'static,
        failed: impl FnOnce(anyhow::Error) -> StreamResult + 'static,
    ) -> Self {
        Self {
            done: Box::new(done),
            failed: Box::new(failed),
        }
    }
}

/// A directed connection from a source-side handle to a sink-side handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub source: FactoryId,
    pub sink: FactoryId,
}

/// A rewirable graph of streams exchanging chunks of type `T`.
///
/// Streams are opened lazily from the factories named by the wiring once the
/// network is started, and identified by their factory so that a factory
/// referenced by several wirings yields a single stream. Data from a source
/// fans out to every distinct sink it is connected to; a sink finishes once
/// all of its sources have ended; a source is paused while any of its sinks
/// refuses more data.
///
/// The network keeps no strong reference to itself: the owner keeps the
/// [`PipelineNetwork`] or the [`NetworkStream`] alive while it runs.
pub struct PipelineNetwork<T> {
    core: Rc<NetworkCore<T>>,
}

impl<T> Clone for PipelineNetwork<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: Clone + 'static> Default for PipelineNetwork<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> PipelineNetwork<T> {
    pub fn new() -> Self {
        Self {
            core: Rc::new_cyclic(|weak| NetworkCore {
                weak: weak.clone(),
                state: RefCell::new(NetworkState::default()),
                started: Cell::new(false),
                destroyed: Cell::new(false),
                failed: Cell::new(false),
            }),
        }
    }

    /// Replaces the wiring. Before the network starts the wirings are only
    /// recorded; afterwards new streams are opened, the connections replaced
    /// and streams no longer referenced are destroyed.
    pub fn rewire(&self, wirings: Vec<Wiring<T>>) -> StreamResult {
        self.core.rewire(wirings)
    }

    /// Starts the network and applies the recorded wiring.
    pub fn stream(&self, callbacks: NetworkCallbacks) -> StreamResult<NetworkStream<T>> {
        self.core.start(callbacks)?;
        Ok(NetworkStream {
            core: Rc::clone(&self.core),
        })
    }

    pub fn is_started(&self) -> bool {
        self.core.started.get()
    }

    /// Current connections in wiring order.
    pub fn connections(&self) -> Vec<Connection> {
        self.core.state.borrow().connections.clone()
    }
}

/// Running network returned by [`PipelineNetwork::stream`].
pub struct NetworkStream<T> {
    core: Rc<NetworkCore<T>>,
}

impl<T: Clone + 'static> NetworkStream<T> {
    /// Destroys every live stream still referenced by the connections.
    pub fn destroy(&self) -> StreamResult {
        self.core.destroy()
    }

    pub fn is_destroyed(&self) -> bool {
        self.core.destroyed.get()
    }

    pub fn is_failed(&self) -> bool {
        self.core.failed.get()
    }
}

#[derive(Clone, Copy)]
enum Side {
    Source,
    Sink,
}

enum Endpoint<T> {
    Source(Source<T>),
    Sink(Sink<T>),
    Duplex(Duplex<T, T>),
}

impl<T> Clone for Endpoint<T> {
    fn clone(&self) -> Self {
        match self {
            Endpoint::Source(source) => Endpoint::Source(source.clone()),
            Endpoint::Sink(sink) => Endpoint::Sink(sink.clone()),
            Endpoint::Duplex(duplex) => Endpoint::Duplex(duplex.clone()),
        }
    }
}

/// The opened stream behind one or two handles. A duplex is shared by its
/// source-side and sink-side handle and is destroyed once both released it.
struct StreamSlot<T> {
    endpoint: RefCell<Option<Endpoint<T>>>,
    source_released: Cell<bool>,
    sink_released: Cell<bool>,
}

impl<T: 'static> StreamSlot<T> {
    fn new() -> Self {
        Self {
            endpoint: RefCell::new(None),
            source_released: Cell::new(false),
            sink_released: Cell::new(false),
        }
    }

    fn fill(&self, endpoint: Endpoint<T>) {
        *self.endpoint.borrow_mut() = Some(endpoint);
    }

    fn endpoint(&self) -> Option<Endpoint<T>> {
        self.endpoint.borrow().clone()
    }

    fn is_destroyable(&self) -> bool {
        match self.endpoint() {
            None => false,
            Some(Endpoint::Source(source)) => !source.phase().is_terminal(),
            Some(Endpoint::Sink(sink)) => !sink.phase().is_terminal(),
            Some(Endpoint::Duplex(duplex)) => matches!(
                duplex.phase(),
                DuplexPhase::Active { output, input }
                    if !(output == OutputPhase::Ended && input == InputPhase::Finished)
            ),
        }
    }

    fn destroy(&self) -> StreamResult {
        if !self.is_destroyable() {
            return Ok(());
        }

        match self.endpoint() {
            Some(Endpoint::Source(source)) => source.destroy(),
            Some(Endpoint::Sink(sink)) => sink.destroy(Some(DESTROY_REASON)),
            Some(Endpoint::Duplex(duplex)) => duplex.destroy(),
            None => Ok(()),
        }
    }

    fn release(&self, side: Side) -> StreamResult {
        match side {
            Side::Source => self.source_released.set(true),
            Side::Sink => self.sink_released.set(true),
        }

        let is_duplex = matches!(self.endpoint(), Some(Endpoint::Duplex(_)));
        if is_duplex && !(self.source_released.get() && self.sink_released.get()) {
            return Ok(());
        }

        self.destroy()
    }
}

struct SourceHandle<T> {
    id: FactoryId,
    slot: Rc<StreamSlot<T>>,
    paused: Cell<bool>,
    ended: Cell<bool>,
}

impl<T: 'static> SourceHandle<T> {
    fn new(id: FactoryId, slot: Rc<StreamSlot<T>>) -> Self {
        Self {
            id,
            slot,
            paused: Cell::new(true),
            ended: Cell::new(false),
        }
    }

    /// Whether pause and resume may be forwarded right now.
    fn is_steerable(&self) -> bool {
        if self.ended.get() {
            return false;
        }

        match self.slot.endpoint() {
            Some(Endpoint::Source(source)) => !source.phase().is_terminal(),
            Some(Endpoint::Duplex(duplex)) => {
                matches!(duplex.phase(), DuplexPhase::Active { output, .. } if output != OutputPhase::Ended)
            }
            _ => false,
        }
    }

    /// A stream may be paused from within its own `next` but not resumed.
    fn is_emitting(&self) -> bool {
        match self.slot.endpoint() {
            Some(Endpoint::Source(source)) => source.in_flight(Operation::Next),
            Some(Endpoint::Duplex(duplex)) => duplex.in_flight(Operation::Next),
            _ => false,
        }
    }

    fn pause(&self) -> StreamResult {
        self.paused.set(true);
        match self.slot.endpoint() {
            Some(Endpoint::Source(source)) => source.pause(),
            Some(Endpoint::Duplex(duplex)) => duplex.pause(),
            _ => Ok(()),
        }
    }

    fn resume(&self) -> StreamResult {
        self.paused.set(false);
        match self.slot.endpoint() {
            Some(Endpoint::Source(source)) => source.resume(),
            Some(Endpoint::Duplex(duplex)) => duplex.resume(),
            _ => Ok(()),
        }
    }
}

struct SinkHandle<T> {
    id: FactoryId,
    slot: Rc<StreamSlot<T>>,
    takes_more: Cell<bool>,
    finishing: Cell<bool>,
    finished: Cell<bool>,
}

impl<T: 'static> SinkHandle<T> {
    fn new(id: FactoryId, slot: Rc<StreamSlot<T>>) -> Self {
        Self {
            id,
            slot,
            takes_more: Cell::new(true),
            finishing: Cell::new(false),
            finished: Cell::new(false),
        }
    }

    fn accepts_input(&self) -> bool {
        match self.slot.endpoint() {
            Some(Endpoint::Sink(sink)) => !sink.phase().is_terminal(),
            Some(Endpoint::Duplex(duplex)) => {
                matches!(duplex.phase(), DuplexPhase::Active { input, .. } if input != InputPhase::Finished)
            }
            _ => false,
        }
    }

    /// Writes a batch and reports whether the sink just stopped taking more.
    fn write(&self, chunks: Vec<T>) -> StreamResult<bool> {
        if !self.accepts_input() {
            return Ok(false);
        }

        let takes_more = match self.slot.endpoint() {
            Some(Endpoint::Sink(sink)) => sink.write(chunks)?,
            Some(Endpoint::Duplex(duplex)) => duplex.write(chunks)?,
            _ => return Ok(false),
        };

        if !takes_more && self.takes_more.get() {
            self.takes_more.set(false);
            return Ok(true);
        }
        Ok(false)
    }

    fn finish(&self, done: impl FnOnce() -> StreamResult + 'static) -> StreamResult {
        self.finishing.set(true);
        match self.slot.endpoint() {
            Some(Endpoint::Sink(sink)) => sink.finish(done),
            Some(Endpoint::Duplex(duplex)) => duplex.finish(done),
            _ => Ok(()),
        }
    }
}

struct NetworkState<T> {
    pending: Vec<Wiring<T>>,
    sources: HashMap<FactoryId, Rc<SourceHandle<T>>>,
    sinks: HashMap<FactoryId, Rc<SinkHandle<T>>>,
    connections: Vec<Connection>,
    done: Option<Box<dyn FnOnce() -> StreamResult>>,
    failed: Option<Box<dyn FnOnce(anyhow::Error) -> StreamResult>>,
}

impl<T> Default for NetworkState<T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            sources: HashMap::new(),
            sinks: HashMap::new(),
            connections: Vec::new(),
            done: None,
            failed: None,
        }
    }
}

impl<T> NetworkState<T> {
    fn distinct_sources(&self) -> Vec<Rc<SourceHandle<T>>> {
        let mut seen = Vec::new();
        for connection in &self.connections {
            if !seen.contains(&connection.source) {
                seen.push(connection.source);
            }
        }
        seen.iter().filter_map(|id| self.sources.get(id).cloned()).collect()
    }

    fn distinct_sinks(&self) -> Vec<Rc<SinkHandle<T>>> {
        let mut seen = Vec::new();
        for connection in &self.connections {
            if !seen.contains(&connection.sink) {
                seen.push(connection.sink);
            }
        }
        seen.iter().filter_map(|id| self.sinks.get(id).cloned()).collect()
    }

    fn targets_of(&self, source: FactoryId) -> Vec<Rc<SinkHandle<T>>> {
        let mut seen = Vec::new();
        for connection in self.connections.iter().filter(|c| c.source == source) {
            if !seen.contains(&connection.sink) {
                seen.push(connection.sink);
            }
        }
        seen.iter().filter_map(|id| self.sinks.get(id).cloned()).collect()
    }

    fn feeders_of(&self, sink: FactoryId) -> Vec<Rc<SourceHandle<T>>> {
        let mut seen = Vec::new();
        for connection in self.connections.iter().filter(|c| c.sink == sink) {
            if !seen.contains(&connection.source) {
                seen.push(connection.source);
            }
        }
        seen.iter().filter_map(|id| self.sources.get(id).cloned()).collect()
    }

    fn handle_count(&self) -> usize {
        let mut ids: Vec<FactoryId> = self.sources.keys().chain(self.sinks.keys()).copied().collect();
        ids.sort();
        ids.dedup();
        ids.len()
    }

    /// Drops handles no connection references any more and returns the
    /// sides to release, ordered by stream.
    fn retire_unreferenced(&mut self) -> Vec<(FactoryId, Side, Rc<StreamSlot<T>>)> {
        let mut source_refs: HashMap<FactoryId, usize> = HashMap::new();
        let mut sink_refs: HashMap<FactoryId, usize> = HashMap::new();
        for connection in &self.connections {
            *source_refs.entry(connection.source).or_default() += 1;
            *sink_refs.entry(connection.sink).or_default() += 1;
        }

        let mut retired = Vec::new();
        self.sources.retain(|id, handle| {
            let referenced = source_refs.get(id).copied().unwrap_or(0) > 0;
            if !referenced {
                retired.push((*id, Side::Source, Rc::clone(&handle.slot)));
            }
            referenced
        });
        self.sinks.retain(|id, handle| {
            let referenced = sink_refs.get(id).copied().unwrap_or(0) > 0;
            if !referenced {
                retired.push((*id, Side::Sink, Rc::clone(&handle.slot)));
            }
            referenced
        });

        retired.sort_by_key(|(id, _, _)| *id);
        retired
    }
}

struct NetworkCore<T> {
    weak: Weak<NetworkCore<T>>,
    state: RefCell<NetworkState<T>>,
    started: Cell<bool>,
    destroyed: Cell<bool>,
    failed: Cell<bool>,
}

impl<T: Clone + 'static> NetworkCore<T> {
    fn halted(&self) -> bool {
        self.destroyed.get() || self.failed.get()
    }

    fn start(&self, callbacks: NetworkCallbacks) -> StreamResult {
        if self.started.get() {
            return Err(StreamError::usage(UsageFault::NetworkAlreadyStarted, "stream"));
        }
        self.started.set(true);

        let pending = {
            let mut state = self.state.borrow_mut();
            state.done = Some(callbacks.done);
            state.failed = Some(callbacks.failed);
            std::mem::take(&mut state.pending)
        };

        self.apply(pending)?;

        let state = self.state.borrow();
        NetworkStarted {
            connections: state.connections.len(),
            handles: state.handle_count(),
        }
        .log();
        Ok(())
    }

    fn rewire(&self, wirings: Vec<Wiring<T>>) -> StreamResult {
        if !self.started.get() {
            self.state.borrow_mut().pending = wirings;
            return Ok(());
        }
        self.apply(wirings)
    }

    fn apply(&self, wirings: Vec<Wiring<T>>) -> StreamResult {
        if self.destroyed.get() {
            return Err(StreamError::new(
                ErrorKind::AlreadyDestroyed,
                "rewire",
                "cannot rewire a destroyed network",
            ));
        }
        if self.failed.get() {
            return Err(StreamError::new(
                ErrorKind::AlreadyFailed,
                "rewire",
                "cannot rewire a failed network",
            ));
        }

        // a stream failing while it is opened tears the network down; stop
        // opening further streams in that case
        let mut connections = Vec::new();
        for wiring in &wirings {
            let mut upstream = self.ensure_source(&wiring.from)?;
            if self.halted() {
                return Ok(());
            }

            for duplex in &wiring.via {
                let id = self.ensure_duplex(duplex)?;
                if self.halted() {
                    return Ok(());
                }
                connections.push(Connection {
                    source: upstream,
                    sink: id,
                });
                upstream = id;
            }

            let sink = self.ensure_sink(&wiring.to)?;
            if self.halted() {
                return Ok(());
            }
            connections.push(Connection {
                source: upstream,
                sink,
            });
        }

        let retired = {
            let mut state = self.state.borrow_mut();
            state.connections = connections;
            state.retire_unreferenced()
        };

        let rewired = NetworkRewired {
            connections: self.state.borrow().connections.len(),
            retired: retired.len(),
        };
        rewired.log();
        let span = rewired.span("apply_wiring");
        let _guard = span.enter();

        for (_, side, slot) in retired {
            slot.release(side)?;
        }

        self.maybe_pause_or_resume()
    }

    fn ensure_source(&self, factory: &SourceFactory<T>) -> StreamResult<FactoryId> {
        let id = factory.id();
        if self.state.borrow().sources.contains_key(&id) {
            return Ok(id);
        }

        // registered before opening so a failure during open finds its handle
        let slot = Rc::new(StreamSlot::new());
        self.state
            .borrow_mut()
            .sources
            .insert(id, Rc::new(SourceHandle::new(id, Rc::clone(&slot))));

        let opened = factory.open(SourceEvents {
            network: self.weak.clone(),
            id,
        });
        match opened {
            Ok(source) => {
                slot.fill(Endpoint::Source(source));
                Ok(id)
            }
            Err(error) => {
                self.state.borrow_mut().sources.remove(&id);
                Err(error)
            }
        }
    }

    fn ensure_sink(&self, factory: &SinkFactory<T>) -> StreamResult<FactoryId> {
        let id = factory.id();
        if self.state.borrow().sinks.contains_key(&id) {
            return Ok(id);
        }

        let slot = Rc::new(StreamSlot::new());
        self.state
            .borrow_mut()
            .sinks
            .insert(id, Rc::new(SinkHandle::new(id, Rc::clone(&slot))));

        let opened = factory.open(SinkEvents {
            network: self.weak.clone(),
            id,
        });
        match opened {
            Ok(sink) => {
                slot.fill(Endpoint::Sink(sink));
                Ok(id)
            }
            Err(error) => {
                self.state.borrow_mut().sinks.remove(&id);
                Err(error)
            }
        }
    }

    fn ensure_duplex(&self, factory: &DuplexFactory<T, T>) -> StreamResult<FactoryId> {
        let id = factory.id();
        {
            let state = self.state.borrow();
            if state.sources.contains_key(&id) && state.sinks.contains_key(&id) {
                return Ok(id);
            }
        }

        let slot = Rc::new(StreamSlot::new());
        {
            let mut state = self.state.borrow_mut();
            state
                .sources
                .insert(id, Rc::new(SourceHandle::new(id, Rc::clone(&slot))));
            state
                .sinks
                .insert(id, Rc::new(SinkHandle::new(id, Rc::clone(&slot))));
        }

        let opened = factory.open(DuplexEvents {
            network: self.weak.clone(),
            id,
        });
        match opened {
            Ok(duplex) => {
                slot.fill(Endpoint::Duplex(duplex));
                Ok(id)
            }
            Err(error) => {
                let mut state = self.state.borrow_mut();
                state.sources.remove(&id);
                state.sinks.remove(&id);
                Err(error)
            }
        }
    }

    fn handle_next(&self, source: FactoryId, chunks: Vec<T>) -> StreamResult {
        if self.halted() {
            return Ok(());
        }

        let targets = self.state.borrow().targets_of(source);
        let Some((last, rest)) = targets.split_last() else {
            return Ok(());
        };

        let mut capacity_dropped = false;
        for target in rest {
            if self.halted() {
                return Ok(());
            }
            capacity_dropped |= target.write(chunks.clone())?;
        }
        if self.halted() {
            return Ok(());
        }
        capacity_dropped |= last.write(chunks)?;

        if capacity_dropped {
            self.maybe_pause_or_resume()?;
        }
        Ok(())
    }

    fn handle_end(&self, source: FactoryId) -> StreamResult {
        let handle = self.state.borrow().sources.get(&source).cloned();
        if let Some(handle) = handle {
            handle.ended.set(true);
        }
        self.maybe_finish_some()
    }

    fn handle_drain(&self, sink: FactoryId) -> StreamResult {
        let handle = self.state.borrow().sinks.get(&sink).cloned();
        if let Some(handle) = handle {
            handle.takes_more.set(true);
        }
        self.maybe_pause_or_resume()
    }

    fn handle_fail(&self, stream: FactoryId, error: anyhow::Error) -> StreamResult {
        if self.halted() {
            FailureDropped {
                stream,
                error: &error,
            }
            .log();
            return Ok(());
        }
        self.failed.set(true);
        NetworkFailed {
            stream,
            error: &error,
        }
        .log();

        let slots: Vec<Rc<StreamSlot<T>>> = {
            let state = self.state.borrow();
            let mut slots: Vec<(FactoryId, Rc<StreamSlot<T>>)> = state
                .sources
                .values()
                .map(|h| (h.id, Rc::clone(&h.slot)))
                .chain(state.sinks.values().map(|h| (h.id, Rc::clone(&h.slot))))
                .filter(|(id, _)| *id != stream)
                .collect();
            slots.sort_by_key(|(id, _)| *id);
            slots.dedup_by_key(|(id, _)| *id);
            slots.into_iter().map(|(_, slot)| slot).collect()
        };

        for slot in slots {
            slot.destroy()?;
        }

        let failed = self.state.borrow_mut().failed.take();
        match failed {
            Some(failed) => failed(error),
            None => Ok(()),
        }
    }

    fn handle_sink_finished(&self, sink: FactoryId) -> StreamResult {
        let handle = self.state.borrow().sinks.get(&sink).cloned();
        if let Some(handle) = handle {
            handle.finished.set(true);
        }
        self.maybe_network_done()
    }

    /// Finishes every sink whose sources have all ended.
    fn maybe_finish_some(&self) -> StreamResult {
        let sinks = self.state.borrow().distinct_sinks();
        for sink in sinks {
            if self.halted() {
                return Ok(());
            }
            if sink.finishing.get() || !sink.accepts_input() {
                continue;
            }

            let feeders = self.state.borrow().feeders_of(sink.id);
            if feeders.iter().all(|source| source.ended.get()) {
                let network = self.weak.clone();
                let id = sink.id;
                sink.finish(move || match network.upgrade() {
                    Some(core) => core.handle_sink_finished(id),
                    None => Ok(()),
                })?;
            }
        }
        Ok(())
    }

    fn maybe_network_done(&self) -> StreamResult {
        if self.halted() {
            return Ok(());
        }

        let sinks = self.state.borrow().distinct_sinks();
        if sinks.is_empty() || !sinks.iter().all(|sink| sink.finished.get()) {
            return Ok(());
        }

        let done = self.state.borrow_mut().done.take();
        match done {
            Some(done) => {
                NetworkCompleted { sinks: sinks.len() }.log();
                done()
            }
            None => Ok(()),
        }
    }

    /// Resumes every source whose sinks all take more and pauses every
    /// source with at least one sink that does not.
    fn maybe_pause_or_resume(&self) -> StreamResult {
        let sources = self.state.borrow().distinct_sources();
        for source in sources {
            if self.halted() {
                return Ok(());
            }
            if !source.is_steerable() {
                continue;
            }

            let targets = self.state.borrow().targets_of(source.id);
            let all_take_more = targets.iter().all(|sink| sink.takes_more.get());

            if source.paused.get() && all_take_more {
                // revisited on the next drain once the emission returned
                if !source.is_emitting() {
                    source.resume()?;
                }
            } else if !source.paused.get() && !all_take_more {
                source.pause()?;
            }
        }
        Ok(())
    }

    fn destroy(&self) -> StreamResult {
        if self.destroyed.get() {
            return Err(StreamError::new(
                ErrorKind::AlreadyDestroyed,
                "destroy",
                "cannot destroy a destroyed network",
            ));
        }
        self.destroyed.set(true);

        let (sources, sinks) = {
            let state = self.state.borrow();
            (state.distinct_sources(), state.distinct_sinks())
        };

        NetworkDestroyed {
            handles: self.state.borrow().handle_count(),
        }
        .log();

        for source in sources {
            source.slot.release(Side::Source)?;
        }
        for sink in sinks {
            sink.slot.release(Side::Sink)?;
        }
        Ok(())
    }
}

struct SourceEvents<T> {
    network: Weak<NetworkCore<T>>,
    id: FactoryId,
}

impl<T: Clone + 'static> SourceListener<T> for SourceEvents<T> {
    fn on_next(&self, chunks: Vec<T>) -> StreamResult {
        match self.network.upgrade() {
            Some(core) => core.handle_next(self.id, chunks),
            None => Ok(()),
        }
    }

    fn on_end(&self) -> StreamResult {
        match self.network.upgrade() {
            Some(core) => core.handle_end(self.id),
            None => Ok(()),
        }
    }

    fn on_fail(&self, error: anyhow::Error) -> StreamResult {
        match self.network.upgrade() {
            Some(core) => core.handle_fail(self.id, error),
            None => Ok(()),
        }
    }
}

struct SinkEvents<T> {
    network: Weak<NetworkCore<T>>,
    id: FactoryId,
}

impl<T: Clone + 'static> SinkListener for SinkEvents<T> {
    fn on_drain(&self) -> StreamResult {
        match self.network.upgrade() {
            Some(core) => core.handle_drain(self.id),
            None => Ok(()),
        }
    }

    fn on_fail(&self, error: anyhow::Error) -> StreamResult {
        match self.network.upgrade() {
            Some(core) => core.handle_fail(self.id, error),
            None => Ok(()),
        }
    }
}

struct DuplexEvents<T> {
    network: Weak<NetworkCore<T>>,
    id: FactoryId,
}

impl<T: Clone + 'static> DuplexListener<T> for DuplexEvents<T> {
    fn on_next(&self, chunks: Vec<T>) -> StreamResult {
        match self.network.upgrade() {
            Some(core) => core.handle_next(self.id, chunks),
            None => Ok(()),
        }
    }

    fn on_end(&self) -> StreamResult {
        match self.network.upgrade() {
            Some(core) => core.handle_end(self.id),
            None => Ok(()),
        }
    }

    fn on_drain(&self) -> StreamResult {
        match self.network.upgrade() {
            Some(core) => core.handle_drain(self.id),
            None => Ok(()),
        }
    }

    fn on_fail(&self, error: anyhow::Error) -> StreamResult {
        match self.network.upgrade() {
            Some(core) => core.handle_fail(self.id, error),
            None => Ok(()),
        }
    }
}
