// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Adapters exposing a whole network as a single stream.
//!
//! Each adapter hands the network builder one or two virtual endpoints
//! bridged to the outer stream. Data reaching a virtual endpoint before the
//! outer stream can forward it is held back and flushed on the first resume.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::errors::StreamResult;
use crate::pipeline::{NetworkCallbacks, NetworkStream, PipelineNetwork};
use crate::stream::{
    DuplexFactory, DuplexImpl, DuplexOutput, FinishCompletion, SinkControl, SinkFactory, SinkImpl,
    SourceFactory, SourceImpl, SourceOutput,
};

/// Exposes a network as a source. `open` receives the sink the network
/// writes its output to; the network starts on the first resume and the
/// source ends once the network is done.
pub fn pipeline_source<T, F>(open: F) -> SourceFactory<T>
where
    T: Clone + 'static,
    F: FnOnce(SinkFactory<T>) -> StreamResult<PipelineNetwork<T>> + 'static,
{
    SourceFactory::try_new(move |output| {
        let bridge = Rc::new(OutputBridge {
            downstream: output,
            paused: Cell::new(false),
            needs_drain: Cell::new(false),
            control: RefCell::new(None),
            finished: Cell::new(false),
        });

        let exit = {
            let bridge = Rc::clone(&bridge);
            SinkFactory::new(move |control| {
                *bridge.control.borrow_mut() = Some(control);
                VirtualExit { bridge }
            })
        };

        let network = open(exit)?;
        Ok(PipelineSource {
            bridge,
            network: RefCell::new(Some(network)),
            stream: RefCell::new(None),
            destroyed: Cell::new(false),
        })
    })
}

struct OutputBridge<T> {
    downstream: SourceOutput<T>,
    paused: Cell<bool>,
    needs_drain: Cell<bool>,
    control: RefCell<Option<SinkControl>>,
    finished: Cell<bool>,
}

struct VirtualExit<T> {
    bridge: Rc<OutputBridge<T>>,
}

impl<T> SinkImpl<T> for VirtualExit<T> {
    fn write(&self, chunks: Vec<T>) -> StreamResult<bool> {
        let bridge = &self.bridge;
        bridge.downstream.next(chunks)?;

        let takes_more = !bridge.paused.get();
        if !takes_more {
            bridge.needs_drain.set(true);
        }
        Ok(takes_more)
    }

    fn finish(&self, done: FinishCompletion) -> StreamResult {
        self.bridge.finished.set(true);
        done.complete()
    }
}

struct PipelineSource<T> {
    bridge: Rc<OutputBridge<T>>,
    network: RefCell<Option<PipelineNetwork<T>>>,
    stream: RefCell<Option<NetworkStream<T>>>,
    destroyed: Cell<bool>,
}

impl<T: Clone + 'static> SourceImpl for PipelineSource<T> {
    fn pause(&self) -> StreamResult {
        self.bridge.paused.set(true);
        Ok(())
    }

    fn resume(&self) -> StreamResult {
        let bridge = &self.bridge;
        bridge.paused.set(false);

        let network = self.network.borrow_mut().take();
        if let Some(network) = network {
            let on_done = bridge.downstream.clone();
            let on_failed = bridge.downstream.clone();
            let stream = network.stream(NetworkCallbacks::new(
                move || on_done.end(),
                move |error| on_failed.fail(error),
            ))?;

            // destroyed while the network was starting
            if self.destroyed.get() {
                if stream.is_destroyed() {
                    return Ok(());
                }
                return stream.destroy();
            }
            *self.stream.borrow_mut() = Some(stream);
        }

        if bridge.needs_drain.get() && !bridge.finished.get() && !bridge.paused.get() {
            bridge.needs_drain.set(false);
            let control = bridge.control.borrow().clone();
            if let Some(control) = control {
                control.drain()?;
            }
        }
        Ok(())
    }

    fn destroy(&self) -> StreamResult {
        self.destroyed.set(true);
        self.network.borrow_mut().take();
        let stream = self.stream.borrow_mut().take();
        match stream {
            Some(stream) if !stream.is_destroyed() => stream.destroy(),
            _ => Ok(()),
        }
    }
}

/// Exposes a network as a sink. `open` receives the source the network
/// reads the written data from; the network starts when the sink is opened
/// and the sink's finish completes once the network is done.
pub fn pipeline_sink<T, F>(open: F) -> SinkFactory<T>
where
    T: Clone + 'static,
    F: FnOnce(SourceFactory<T>) -> StreamResult<PipelineNetwork<T>> + 'static,
{
    SinkFactory::try_new(move |control| {
        let bridge = Rc::new(InputBridge::new(UpstreamSignal::Sink(control)));
        let network = open(bridge.entry())?;

        let on_done = Rc::clone(&bridge);
        let on_failed = Rc::clone(&bridge);
        let stream = network.stream(NetworkCallbacks::new(
            move || on_done.complete(),
            move |error| on_failed.upstream.fail(error),
        ))?;

        Ok(PipelineSink { bridge, stream })
    })
}

/// Where an input bridge reports capacity and failures.
enum UpstreamSignal<T> {
    Sink(SinkControl),
    Duplex(DuplexOutput<T>),
}

impl<T> UpstreamSignal<T> {
    fn drain(&self) -> StreamResult {
        match self {
            UpstreamSignal::Sink(control) => control.drain(),
            UpstreamSignal::Duplex(output) => output.drain(),
        }
    }

    fn fail(&self, error: anyhow::Error) -> StreamResult {
        match self {
            UpstreamSignal::Sink(control) => control.fail(error),
            UpstreamSignal::Duplex(output) => output.fail(error),
        }
    }
}

/// Feeds data written to the outer stream into the network's virtual entry
/// source.
struct InputBridge<T> {
    upstream: UpstreamSignal<T>,
    entry: RefCell<Option<SourceOutput<T>>>,
    started: Cell<bool>,
    paused: Cell<bool>,
    needs_drain: Cell<bool>,
    backlog: RefCell<Vec<T>>,
    end_pending: Cell<bool>,
    completion: RefCell<Option<FinishCompletion>>,
}

impl<T: Clone + 'static> InputBridge<T> {
    fn new(upstream: UpstreamSignal<T>) -> Self {
        Self {
            upstream,
            entry: RefCell::new(None),
            started: Cell::new(false),
            paused: Cell::new(true),
            needs_drain: Cell::new(false),
            backlog: RefCell::new(Vec::new()),
            end_pending: Cell::new(false),
            completion: RefCell::new(None),
        }
    }

    fn entry(self: &Rc<Self>) -> SourceFactory<T> {
        let bridge = Rc::clone(self);
        SourceFactory::new(move |output| {
            *bridge.entry.borrow_mut() = Some(output);
            VirtualEntry { bridge }
        })
    }

    fn output(&self) -> Option<SourceOutput<T>> {
        self.entry.borrow().clone()
    }

    fn write(&self, chunks: Vec<T>) -> StreamResult<bool> {
        let output = match self.output() {
            Some(output) if self.started.get() => output,
            _ => {
                self.backlog.borrow_mut().extend(chunks);
                self.needs_drain.set(true);
                return Ok(false);
            }
        };

        output.next(chunks)?;

        let takes_more = !self.paused.get();
        if !takes_more {
            self.needs_drain.set(true);
        }
        Ok(takes_more)
    }

    fn finish(&self, done: FinishCompletion) -> StreamResult {
        *self.completion.borrow_mut() = Some(done);
        match self.output() {
            Some(output) if self.started.get() => output.end(),
            _ => {
                self.end_pending.set(true);
                Ok(())
            }
        }
    }

    fn resumed(&self) -> StreamResult {
        self.started.set(true);
        self.paused.set(false);

        let Some(output) = self.output() else {
            return Ok(());
        };

        let backlog = std::mem::take(&mut *self.backlog.borrow_mut());
        if !backlog.is_empty() {
            output.next(backlog)?;
        }

        if self.end_pending.get() {
            self.end_pending.set(false);
            return output.end();
        }

        let finishing = self.completion.borrow().is_some();
        if self.needs_drain.get() && !finishing && !self.paused.get() {
            self.needs_drain.set(false);
            self.upstream.drain()?;
        }
        Ok(())
    }

    fn complete(&self) -> StreamResult {
        let completion = self.completion.borrow_mut().take();
        match completion {
            Some(completion) => completion.complete(),
            None => Ok(()),
        }
    }
}

struct VirtualEntry<T> {
    bridge: Rc<InputBridge<T>>,
}

impl<T: Clone + 'static> SourceImpl for VirtualEntry<T> {
    fn pause(&self) -> StreamResult {
        self.bridge.paused.set(true);
        Ok(())
    }

    fn resume(&self) -> StreamResult {
        self.bridge.resumed()
    }
}

struct PipelineSink<T> {
    bridge: Rc<InputBridge<T>>,
    stream: NetworkStream<T>,
}

impl<T: Clone + 'static> SinkImpl<T> for PipelineSink<T> {
    fn write(&self, chunks: Vec<T>) -> StreamResult<bool> {
        self.bridge.write(chunks)
    }

    fn finish(&self, done: FinishCompletion) -> StreamResult {
        self.bridge.finish(done)
    }

    fn destroy(&self) -> StreamResult {
        if self.stream.is_destroyed() {
            return Ok(());
        }
        self.stream.destroy()
    }
}

/// Exposes a network as a duplex. `open` receives the virtual entry source
/// fed by the duplex's input and the virtual exit sink whose data the
/// duplex emits. The network starts when the duplex is opened; the duplex
/// ends and completes its finish once the network is done.
pub fn pipeline_transform<T, F>(open: F) -> DuplexFactory<T, T>
where
    T: Clone + 'static,
    F: FnOnce(SourceFactory<T>, SinkFactory<T>) -> StreamResult<PipelineNetwork<T>> + 'static,
{
    DuplexFactory::try_new(move |output: DuplexOutput<T>| {
        let input = Rc::new(InputBridge::new(UpstreamSignal::Duplex(output.clone())));
        let exit = Rc::new(DuplexExit {
            downstream: output,
            started: Cell::new(false),
            paused: Cell::new(true),
            needs_drain: Cell::new(false),
            backlog: RefCell::new(Vec::new()),
            end_pending: Cell::new(false),
            control: RefCell::new(None),
            finished: Cell::new(false),
        });

        let exit_factory = {
            let exit = Rc::clone(&exit);
            SinkFactory::new(move |control| {
                *exit.control.borrow_mut() = Some(control);
                ExitSink { exit }
            })
        };

        let network = open(input.entry(), exit_factory)?;

        let on_done_exit = Rc::clone(&exit);
        let on_done_input = Rc::clone(&input);
        let on_failed = exit.downstream.clone();
        let stream = network.stream(NetworkCallbacks::new(
            move || on_done_exit.network_done(&on_done_input),
            move |error| on_failed.fail(error),
        ))?;

        Ok(PipelineTransform {
            input,
            exit,
            stream,
        })
    })
}

/// Carries data from the network's virtual exit sink to the duplex output.
struct DuplexExit<T> {
    downstream: DuplexOutput<T>,
    started: Cell<bool>,
    paused: Cell<bool>,
    needs_drain: Cell<bool>,
    backlog: RefCell<Vec<T>>,
    end_pending: Cell<bool>,
    control: RefCell<Option<SinkControl>>,
    finished: Cell<bool>,
}

impl<T: Clone + 'static> DuplexExit<T> {
    fn write(&self, chunks: Vec<T>) -> StreamResult<bool> {
        if !self.started.get() {
            self.backlog.borrow_mut().extend(chunks);
            self.needs_drain.set(true);
            return Ok(false);
        }

        self.downstream.next(chunks)?;

        let takes_more = !self.paused.get();
        if !takes_more {
            self.needs_drain.set(true);
        }
        Ok(takes_more)
    }

    fn network_done(&self, input: &InputBridge<T>) -> StreamResult {
        if !self.started.get() {
            self.end_pending.set(true);
            return Ok(());
        }
        self.downstream.end()?;
        input.complete()
    }

    fn resumed(&self, input: &InputBridge<T>) -> StreamResult {
        self.started.set(true);
        self.paused.set(false);

        let backlog = std::mem::take(&mut *self.backlog.borrow_mut());
        if !backlog.is_empty() {
            self.downstream.next(backlog)?;
        }

        if self.end_pending.get() {
            self.end_pending.set(false);
            self.downstream.end()?;
            return input.complete();
        }

        if self.needs_drain.get() && !self.finished.get() && !self.paused.get() {
            self.needs_drain.set(false);
            let control = self.control.borrow().clone();
            if let Some(control) = control {
                control.drain()?;
            }
        }
        Ok(())
    }
}

struct ExitSink<T> {
    exit: Rc<DuplexExit<T>>,
}

impl<T: Clone + 'static> SinkImpl<T> for ExitSink<T> {
    fn write(&self, chunks: Vec<T>) -> StreamResult<bool> {
        self.exit.write(chunks)
    }

    fn finish(&self, done: FinishCompletion) -> StreamResult {
        self.exit.finished.set(true);
        done.complete()
    }
}

struct PipelineTransform<T> {
    input: Rc<InputBridge<T>>,
    exit: Rc<DuplexExit<T>>,
    stream: NetworkStream<T>,
}

impl<T: Clone + 'static> DuplexImpl<T> for PipelineTransform<T> {
    fn pause(&self) -> StreamResult {
        self.exit.paused.set(true);
        Ok(())
    }

    fn resume(&self) -> StreamResult {
        self.exit.resumed(&self.input)
    }

    fn write(&self, chunks: Vec<T>) -> StreamResult<bool> {
        self.input.write(chunks)
    }

    fn finish(&self, done: FinishCompletion) -> StreamResult {
        self.input.finish(done)
    }

    fn destroy(&self) -> StreamResult {
        if self.stream.is_destroyed() {
            return Ok(());
        }
        self.stream.destroy()
    }
}
