// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Duplex streams: a sink side taking `I` chunks and a source side emitting
//! `O` chunks, guarded as one instance.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::errors::{ErrorKind, StreamError, StreamResult, UsageFault};
use crate::stream::reentrancy::{InFlight, Operation};
use crate::stream::{DoneCallback, FactoryId, FinishCompletion};

/// Output (source side) phase of an active duplex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPhase {
    Init,
    Resumed,
    Paused,
    Ended,
}

/// Input (sink side) phase of an active duplex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPhase {
    Open,
    Finishing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplexPhase {
    Active { output: OutputPhase, input: InputPhase },
    Failed,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    Failed,
    Destroyed,
}

/// Transforming logic behind a duplex.
pub trait DuplexImpl<I> {
    fn pause(&self) -> StreamResult {
        Ok(())
    }

    fn resume(&self) -> StreamResult;

    /// Accepts a batch and reports whether the duplex takes more right away.
    fn write(&self, chunks: Vec<I>) -> StreamResult<bool>;

    fn finish(&self, done: FinishCompletion) -> StreamResult;

    fn destroy(&self) -> StreamResult {
        Ok(())
    }
}

/// Callbacks receiving both the downstream data and the upstream signals.
pub trait DuplexListener<O> {
    fn on_next(&self, chunks: Vec<O>) -> StreamResult;
    fn on_end(&self) -> StreamResult;
    fn on_drain(&self) -> StreamResult;
    fn on_fail(&self, error: anyhow::Error) -> StreamResult;
}

type DuplexOpener<I, O> = Box<dyn FnOnce(DuplexOutput<O>) -> StreamResult<Rc<dyn DuplexImpl<I>>>>;

struct DuplexFactoryInner<I, O> {
    id: FactoryId,
    opener: RefCell<Option<DuplexOpener<I, O>>>,
}

/// Blueprint for a single duplex stream.
pub struct DuplexFactory<I, O> {
    inner: Rc<DuplexFactoryInner<I, O>>,
}

impl<I, O> Clone for DuplexFactory<I, O> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<I, O> fmt::Debug for DuplexFactory<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuplexFactory")
            .field("id", &self.inner.id)
            .field("opened", &self.inner.opener.borrow().is_none())
            .finish()
    }
}

impl<I: 'static, O: 'static> DuplexFactory<I, O> {
    pub fn new<D, F>(open: F) -> Self
    where
        D: DuplexImpl<I> + 'static,
        F: FnOnce(DuplexOutput<O>) -> D + 'static,
    {
        Self::try_new(move |output| Ok(open(output)))
    }

    pub fn try_new<D, F>(open: F) -> Self
    where
        D: DuplexImpl<I> + 'static,
        F: FnOnce(DuplexOutput<O>) -> StreamResult<D> + 'static,
    {
        let opener: DuplexOpener<I, O> =
            Box::new(move |output| open(output).map(|imp| Rc::new(imp) as Rc<dyn DuplexImpl<I>>));

        Self {
            inner: Rc::new(DuplexFactoryInner {
                id: FactoryId::next(),
                opener: RefCell::new(Some(opener)),
            }),
        }
    }

    pub fn id(&self) -> FactoryId {
        self.inner.id
    }

    pub fn is_opened(&self) -> bool {
        self.inner.opener.borrow().is_none()
    }

    pub fn open<L>(&self, listener: L) -> StreamResult<Duplex<I, O>>
    where
        L: DuplexListener<O> + 'static,
    {
        let opener = self.inner.opener.borrow_mut().take().ok_or_else(|| {
            StreamError::new(
                ErrorKind::AlreadyOpened,
                "open",
                "cannot open a stream that is already open",
            )
        })?;

        let shared = Rc::new(DuplexShared {
            id: self.inner.id,
            output: Cell::new(OutputPhase::Init),
            input: Cell::new(InputPhase::Open),
            terminal: Cell::new(None),
            in_flight: InFlight::new(),
            listener: Box::new(listener),
        });

        let imp = opener(DuplexOutput {
            shared: Rc::clone(&shared),
        })?;

        Ok(Duplex { shared, imp })
    }
}

struct DuplexShared<O> {
    id: FactoryId,
    output: Cell<OutputPhase>,
    input: Cell<InputPhase>,
    terminal: Cell<Option<Terminal>>,
    in_flight: InFlight,
    listener: Box<dyn DuplexListener<O>>,
}

impl<O> DuplexShared<O> {
    fn phase(&self) -> DuplexPhase {
        match self.terminal.get() {
            Some(Terminal::Failed) => DuplexPhase::Failed,
            Some(Terminal::Destroyed) => DuplexPhase::Destroyed,
            None => DuplexPhase::Active {
                output: self.output.get(),
                input: self.input.get(),
            },
        }
    }

    /// Shared failed/destroyed guard; failed is reported first.
    fn check_live(&self, operation: &'static str, verb: &str) -> StreamResult {
        match self.terminal.get() {
            Some(Terminal::Failed) => Err(StreamError::new(
                ErrorKind::AlreadyFailed,
                operation,
                format!("cannot {verb} a failed stream"),
            )),
            Some(Terminal::Destroyed) => Err(StreamError::new(
                ErrorKind::AlreadyDestroyed,
                operation,
                format!("cannot {verb} a destroyed stream"),
            )),
            None => Ok(()),
        }
    }

    /// Destroyed is reported before failed on the source side.
    fn check_live_output(&self, operation: &'static str, verb: &str) -> StreamResult {
        match self.terminal.get() {
            Some(Terminal::Destroyed) => Err(StreamError::new(
                ErrorKind::AlreadyDestroyed,
                operation,
                format!("cannot {verb} a destroyed stream"),
            )),
            Some(Terminal::Failed) => Err(StreamError::new(
                ErrorKind::AlreadyFailed,
                operation,
                format!("cannot {verb} a failed stream"),
            )),
            None => Ok(()),
        }
    }

    fn check_input_open(&self, operation: &'static str, verb: &str) -> StreamResult {
        match self.input.get() {
            InputPhase::Finishing => Err(StreamError::new(
                ErrorKind::AlreadyFinishing,
                operation,
                format!("cannot {verb} a stream that is finishing"),
            )),
            InputPhase::Finished => Err(StreamError::new(
                ErrorKind::AlreadyFinished,
                operation,
                format!("cannot {verb} a finished stream"),
            )),
            InputPhase::Open => Ok(()),
        }
    }

    fn reject_during_pause(&self, operation: &'static str) -> StreamResult {
        if self.in_flight.contains(Operation::Pause) {
            return Err(StreamError::new(
                ErrorKind::CallbackDuringPause,
                operation,
                "callbacks not allowed inside a pause call",
            ));
        }
        Ok(())
    }

    fn complete_finish(&self, done: DoneCallback) -> StreamResult {
        self.check_live("finish", "finish")?;
        if self.input.get() == InputPhase::Finished {
            return Err(StreamError::new(
                ErrorKind::AlreadyFinished,
                "finish",
                "cannot finish an already finished stream",
            ));
        }

        self.input.set(InputPhase::Finished);
        done()
    }
}

fn reentrancy(operation: &'static str) -> StreamError {
    StreamError::new(ErrorKind::Reentrancy, operation, "reentrancy detected")
}

/// Guarded handle given to the duplex implementation: emits downstream data
/// and upstream signals.
pub struct DuplexOutput<O> {
    shared: Rc<DuplexShared<O>>,
}

impl<O> Clone for DuplexOutput<O> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<O> DuplexOutput<O> {
    pub fn next(&self, chunks: Vec<O>) -> StreamResult {
        let shared = &self.shared;
        shared.check_live_output("next", "write to")?;

        match shared.output.get() {
            OutputPhase::Init => return Err(StreamError::usage(UsageFault::NeverResumed, "next")),
            OutputPhase::Ended => {
                return Err(StreamError::new(
                    ErrorKind::AlreadyEnded,
                    "next",
                    "cannot write to an ended stream",
                ))
            }
            OutputPhase::Resumed | OutputPhase::Paused => {}
        }

        if chunks.is_empty() {
            return Err(StreamError::usage(UsageFault::EmptyBatch, "next"));
        }

        if shared.in_flight.contains(Operation::Next) {
            return Err(reentrancy("next"));
        }
        shared.reject_during_pause("next")?;

        let _turn = shared.in_flight.enter(Operation::Next);
        shared.listener.on_next(chunks)
    }

    pub fn end(&self) -> StreamResult {
        let shared = &self.shared;
        shared.check_live_output("end", "end")?;

        match shared.output.get() {
            OutputPhase::Init => return Err(StreamError::usage(UsageFault::NeverResumed, "end")),
            OutputPhase::Ended => {
                return Err(StreamError::new(
                    ErrorKind::AlreadyEnded,
                    "end",
                    "cannot end an already ended stream",
                ))
            }
            OutputPhase::Resumed | OutputPhase::Paused => {}
        }

        shared.reject_during_pause("end")?;

        shared.output.set(OutputPhase::Ended);
        shared.listener.on_end()
    }

    pub fn drain(&self) -> StreamResult {
        let shared = &self.shared;
        shared.check_live("drain", "drain")?;
        shared.check_input_open("drain", "drain")?;

        if shared.in_flight.contains(Operation::Drain) {
            return Err(reentrancy("drain"));
        }
        shared.reject_during_pause("drain")?;

        if shared.in_flight.contains(Operation::Write) {
            return Err(StreamError::new(
                ErrorKind::DrainDuringWrite,
                "drain",
                "cannot drain during write",
            ));
        }

        let _turn = shared.in_flight.enter(Operation::Drain);
        shared.listener.on_drain()
    }

    pub fn fail(&self, error: anyhow::Error) -> StreamResult {
        let shared = &self.shared;
        shared.check_live("fail", "fail")?;

        if shared.output.get() == OutputPhase::Ended {
            return Err(StreamError::new(
                ErrorKind::AlreadyEnded,
                "fail",
                "cannot fail a stream that is already ended",
            ));
        }

        shared.reject_during_pause("fail")?;

        shared.terminal.set(Some(Terminal::Failed));
        shared.listener.on_fail(error)
    }
}

/// Guarded handle of an opened duplex: sink operations upstream, source
/// operations downstream.
pub struct Duplex<I, O> {
    shared: Rc<DuplexShared<O>>,
    imp: Rc<dyn DuplexImpl<I>>,
}

impl<I, O> Clone for Duplex<I, O> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            imp: Rc::clone(&self.imp),
        }
    }
}

impl<I, O> fmt::Debug for Duplex<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Duplex")
            .field("id", &self.shared.id)
            .field("phase", &self.shared.phase())
            .finish()
    }
}

impl<I: 'static, O: 'static> Duplex<I, O> {
    pub fn id(&self) -> FactoryId {
        self.shared.id
    }

    pub fn phase(&self) -> DuplexPhase {
        self.shared.phase()
    }

    pub fn in_flight(&self, op: Operation) -> bool {
        self.shared.in_flight.contains(op)
    }

    pub fn pause(&self) -> StreamResult {
        let shared = &self.shared;
        shared.check_live_output("pause", "pause")?;

        match shared.output.get() {
            OutputPhase::Init | OutputPhase::Paused => {
                return Err(StreamError::new(
                    ErrorKind::AlreadyPaused,
                    "pause",
                    "cannot pause a stream that is already paused",
                ))
            }
            OutputPhase::Ended => {
                return Err(StreamError::new(
                    ErrorKind::AlreadyEnded,
                    "pause",
                    "cannot pause an ended stream",
                ))
            }
            OutputPhase::Resumed => {}
        }

        if shared.in_flight.contains(Operation::Pause) {
            return Err(reentrancy("pause"));
        }

        let _turn = shared.in_flight.enter(Operation::Pause);
        shared.output.set(OutputPhase::Paused);
        self.imp.pause()
    }

    pub fn resume(&self) -> StreamResult {
        let shared = &self.shared;
        shared.check_live_output("resume", "resume")?;

        match shared.output.get() {
            OutputPhase::Ended => {
                return Err(StreamError::new(
                    ErrorKind::AlreadyEnded,
                    "resume",
                    "cannot resume an ended stream",
                ))
            }
            OutputPhase::Resumed => {
                return Err(StreamError::new(
                    ErrorKind::NotPaused,
                    "resume",
                    "cannot resume a stream that is not paused",
                ))
            }
            OutputPhase::Init | OutputPhase::Paused => {}
        }

        if shared.in_flight.contains(Operation::Resume) {
            return Err(reentrancy("resume"));
        }

        if shared.in_flight.contains(Operation::Next) {
            return Err(StreamError::new(
                ErrorKind::ResumeDuringNext,
                "resume",
                "cannot resume a stream from within next callback",
            ));
        }

        let _turn = shared.in_flight.enter(Operation::Resume);
        shared.output.set(OutputPhase::Resumed);
        self.imp.resume()
    }

    pub fn write(&self, chunks: Vec<I>) -> StreamResult<bool> {
        let shared = &self.shared;
        shared.check_live("write", "write to")?;
        shared.check_input_open("write", "write to")?;

        if shared.in_flight.contains(Operation::Write) {
            return Err(reentrancy("write"));
        }

        if shared.in_flight.contains(Operation::Next) {
            return Err(StreamError::new(
                ErrorKind::DuplexLoop,
                "write",
                "cannot write to stream from within next callback",
            ));
        }

        let _turn = shared.in_flight.enter(Operation::Write);
        self.imp.write(chunks)
    }

    pub fn finish(&self, done: impl FnOnce() -> StreamResult + 'static) -> StreamResult {
        let shared = &self.shared;
        shared.check_live("finish", "finish")?;
        shared.check_input_open("finish", "finish")?;

        let done: DoneCallback = Box::new(done);
        let completion = {
            let shared = Rc::clone(shared);
            FinishCompletion::new(move || shared.complete_finish(done))
        };

        shared.input.set(InputPhase::Finishing);
        self.imp.finish(completion)
    }

    pub fn destroy(&self) -> StreamResult {
        let shared = &self.shared;
        shared.check_live("destroy", "destroy")?;

        if shared.input.get() == InputPhase::Finished && shared.output.get() == OutputPhase::Ended {
            return Err(StreamError::new(
                ErrorKind::AlreadyFinished,
                "destroy",
                "cannot destroy a finished and ended duplex stream",
            ));
        }

        let _turn = shared.in_flight.enter(Operation::Destroy);
        shared.terminal.set(Some(Terminal::Destroyed));
        self.imp.destroy()
    }
}
