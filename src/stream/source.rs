// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::errors::{ErrorKind, StreamError, StreamResult, UsageFault};
use crate::stream::reentrancy::{InFlight, Operation};
use crate::stream::FactoryId;

/// Phase of a source stream.
///
/// `Init` is paused and has never been resumed; data may only flow once the
/// stream has been resumed at least once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePhase {
    Init,
    Resumed,
    Paused,
    Ended,
    Failed,
    Destroyed,
}

impl SourcePhase {
    pub fn is_paused(self) -> bool {
        matches!(self, SourcePhase::Init | SourcePhase::Paused | SourcePhase::Destroyed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SourcePhase::Ended | SourcePhase::Failed | SourcePhase::Destroyed)
    }
}

/// Producer logic behind a source. Called only after the wrapper accepted
/// the corresponding consumer request.
pub trait SourceImpl {
    fn pause(&self) -> StreamResult {
        Ok(())
    }

    fn resume(&self) -> StreamResult;

    fn destroy(&self) -> StreamResult {
        Ok(())
    }
}

/// Consumer callbacks receiving what a source emits.
pub trait SourceListener<T> {
    fn on_next(&self, chunks: Vec<T>) -> StreamResult;
    fn on_end(&self) -> StreamResult;
    fn on_fail(&self, error: anyhow::Error) -> StreamResult;
}

type SourceOpener<T> = Box<dyn FnOnce(SourceOutput<T>) -> StreamResult<Rc<dyn SourceImpl>>>;

struct SourceFactoryInner<T> {
    id: FactoryId,
    opener: RefCell<Option<SourceOpener<T>>>,
}

/// Blueprint for a single source stream.
pub struct SourceFactory<T> {
    inner: Rc<SourceFactoryInner<T>>,
}

impl<T> Clone for SourceFactory<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> fmt::Debug for SourceFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFactory")
            .field("id", &self.inner.id)
            .field("opened", &self.is_opened())
            .finish()
    }
}

impl<T: 'static> SourceFactory<T> {
    pub fn new<I, F>(open: F) -> Self
    where
        I: SourceImpl + 'static,
        F: FnOnce(SourceOutput<T>) -> I + 'static,
    {
        Self::try_new(move |output| Ok(open(output)))
    }

    /// Like [`SourceFactory::new`] for openers that can fail, e.g. because
    /// they start an embedded network.
    pub fn try_new<I, F>(open: F) -> Self
    where
        I: SourceImpl + 'static,
        F: FnOnce(SourceOutput<T>) -> StreamResult<I> + 'static,
    {
        let opener: SourceOpener<T> =
            Box::new(move |output| open(output).map(|imp| Rc::new(imp) as Rc<dyn SourceImpl>));

        Self {
            inner: Rc::new(SourceFactoryInner {
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

    /// Opens the stream. A factory can be opened once.
    pub fn open<L>(&self, listener: L) -> StreamResult<Source<T>>
    where
        L: SourceListener<T> + 'static,
    {
        let opener = self.inner.opener.borrow_mut().take().ok_or_else(|| {
            StreamError::new(
                ErrorKind::AlreadyOpened,
                "open",
                "cannot open a stream that is already open",
            )
        })?;

        let shared = Rc::new(SourceShared {
            id: self.inner.id,
            phase: Cell::new(SourcePhase::Init),
            in_flight: InFlight::new(),
            listener: Box::new(listener),
        });

        let producer = opener(SourceOutput {
            shared: Rc::clone(&shared),
        })?;

        Ok(Source { shared, producer })
    }
}

struct SourceShared<T> {
    id: FactoryId,
    phase: Cell<SourcePhase>,
    in_flight: InFlight,
    listener: Box<dyn SourceListener<T>>,
}

fn violation(kind: ErrorKind, operation: &'static str, message: &str) -> StreamError {
    StreamError::new(kind, operation, message)
}

/// Guarded emission handle given to the producer.
pub struct SourceOutput<T> {
    shared: Rc<SourceShared<T>>,
}

impl<T> Clone for SourceOutput<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T> SourceOutput<T> {
    pub fn next(&self, chunks: Vec<T>) -> StreamResult {
        let shared = &self.shared;

        match shared.phase.get() {
            SourcePhase::Destroyed => {
                return Err(violation(ErrorKind::AlreadyDestroyed, "next", "cannot write to a destroyed stream"))
            }
            SourcePhase::Failed => {
                return Err(violation(ErrorKind::AlreadyFailed, "next", "cannot write to a failed stream"))
            }
            SourcePhase::Init => return Err(StreamError::usage(UsageFault::NeverResumed, "next")),
            SourcePhase::Ended => {
                return Err(violation(ErrorKind::AlreadyEnded, "next", "cannot write to an ended stream"))
            }
            SourcePhase::Resumed | SourcePhase::Paused => {}
        }

        if chunks.is_empty() {
            return Err(StreamError::usage(UsageFault::EmptyBatch, "next"));
        }

        if shared.in_flight.contains(Operation::Pause) {
            return Err(violation(
                ErrorKind::CallbackDuringPause,
                "next",
                "callbacks not allowed inside a pause call",
            ));
        }

        if shared.in_flight.contains(Operation::Next) {
            return Err(violation(ErrorKind::Reentrancy, "next", "reentrancy detected"));
        }

        let _turn = shared.in_flight.enter(Operation::Next);
        shared.listener.on_next(chunks)
    }

    pub fn end(&self) -> StreamResult {
        let shared = &self.shared;

        match shared.phase.get() {
            SourcePhase::Destroyed => {
                return Err(violation(ErrorKind::AlreadyDestroyed, "end", "cannot end a destroyed stream"))
            }
            SourcePhase::Failed => {
                return Err(violation(ErrorKind::AlreadyFailed, "end", "cannot end a failed stream"))
            }
            SourcePhase::Init => return Err(StreamError::usage(UsageFault::NeverResumed, "end")),
            SourcePhase::Ended => {
                return Err(violation(ErrorKind::AlreadyEnded, "end", "cannot end an already ended stream"))
            }
            SourcePhase::Resumed | SourcePhase::Paused => {}
        }

        if shared.in_flight.contains(Operation::Pause) {
            return Err(violation(
                ErrorKind::CallbackDuringPause,
                "end",
                "callbacks not allowed inside a pause call",
            ));
        }

        // resume is allowed
        if shared.in_flight.contains(Operation::Next) {
            return Err(violation(ErrorKind::Reentrancy, "end", "reentrancy detected"));
        }

        let _turn = shared.in_flight.enter(Operation::End);
        shared.phase.set(SourcePhase::Ended);
        shared.listener.on_end()
    }

    pub fn fail(&self, error: anyhow::Error) -> StreamResult {
        let shared = &self.shared;

        match shared.phase.get() {
            SourcePhase::Failed => {
                return Err(violation(
                    ErrorKind::AlreadyFailed,
                    "fail",
                    "cannot fail a stream that is already failed",
                ))
            }
            SourcePhase::Destroyed => {
                return Err(violation(
                    ErrorKind::AlreadyDestroyed,
                    "fail",
                    "cannot fail a stream that is already destroyed",
                ))
            }
            SourcePhase::Ended => {
                return Err(violation(
                    ErrorKind::AlreadyEnded,
                    "fail",
                    "cannot fail a stream that is already ended",
                ))
            }
            SourcePhase::Init | SourcePhase::Resumed | SourcePhase::Paused => {}
        }

        if shared.in_flight.contains(Operation::Pause) {
            return Err(violation(
                ErrorKind::CallbackDuringPause,
                "fail",
                "callbacks not allowed inside a pause call",
            ));
        }

        if shared.in_flight.contains(Operation::Next) {
            return Err(violation(ErrorKind::Reentrancy, "fail", "reentrancy detected"));
        }

        let _turn = shared.in_flight.enter(Operation::Fail);
        shared.phase.set(SourcePhase::Failed);
        shared.listener.on_fail(error)
    }
}

/// Guarded consumer-facing handle of an opened source.
pub struct Source<T> {
    shared: Rc<SourceShared<T>>,
    producer: Rc<dyn SourceImpl>,
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            producer: Rc::clone(&self.producer),
        }
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("id", &self.shared.id)
            .field("phase", &self.shared.phase.get())
            .finish()
    }
}

impl<T> Source<T> {
    pub fn id(&self) -> FactoryId {
        self.shared.id
    }

    pub fn phase(&self) -> SourcePhase {
        self.shared.phase.get()
    }

    /// True while `op` is executing on this stream.
    pub fn in_flight(&self, op: Operation) -> bool {
        self.shared.in_flight.contains(op)
    }

    pub fn pause(&self) -> StreamResult {
        let shared = &self.shared;

        match shared.phase.get() {
            SourcePhase::Destroyed => {
                return Err(violation(ErrorKind::AlreadyDestroyed, "pause", "cannot pause a destroyed stream"))
            }
            SourcePhase::Failed => {
                return Err(violation(ErrorKind::AlreadyFailed, "pause", "cannot pause a failed stream"))
            }
            SourcePhase::Init | SourcePhase::Paused => {
                return Err(violation(
                    ErrorKind::AlreadyPaused,
                    "pause",
                    "cannot pause a stream that is already paused",
                ))
            }
            SourcePhase::Ended => {
                return Err(violation(ErrorKind::AlreadyEnded, "pause", "cannot pause an ended stream"))
            }
            SourcePhase::Resumed => {}
        }

        // resume and next are allowed
        if shared
            .in_flight
            .any(&[Operation::End, Operation::Fail, Operation::Destroy])
        {
            return Err(violation(ErrorKind::Reentrancy, "pause", "reentrancy detected"));
        }

        let _turn = shared.in_flight.enter(Operation::Pause);
        shared.phase.set(SourcePhase::Paused);
        self.producer.pause()
    }

    pub fn resume(&self) -> StreamResult {
        let shared = &self.shared;

        match shared.phase.get() {
            SourcePhase::Destroyed => {
                return Err(violation(ErrorKind::AlreadyDestroyed, "resume", "cannot resume a destroyed stream"))
            }
            SourcePhase::Failed => {
                return Err(violation(ErrorKind::AlreadyFailed, "resume", "cannot resume a failed stream"))
            }
            SourcePhase::Ended => {
                return Err(violation(ErrorKind::AlreadyEnded, "resume", "cannot resume an ended stream"))
            }
            SourcePhase::Resumed => {
                return Err(violation(
                    ErrorKind::NotPaused,
                    "resume",
                    "cannot resume a stream that is not paused",
                ))
            }
            SourcePhase::Init | SourcePhase::Paused => {}
        }

        if shared.in_flight.contains(Operation::Next) {
            return Err(violation(
                ErrorKind::ResumeDuringNext,
                "resume",
                "cannot resume a stream during a next call",
            ));
        }

        if shared.in_flight.any(&[Operation::Pause, Operation::Resume]) {
            return Err(violation(ErrorKind::Reentrancy, "resume", "reentrancy detected"));
        }

        let _turn = shared.in_flight.enter(Operation::Resume);
        shared.phase.set(SourcePhase::Resumed);
        self.producer.resume()
    }

    pub fn destroy(&self) -> StreamResult {
        let shared = &self.shared;

        match shared.phase.get() {
            SourcePhase::Destroyed => {
                return Err(violation(ErrorKind::AlreadyDestroyed, "destroy", "cannot destroy a destroyed stream"))
            }
            SourcePhase::Failed => {
                return Err(violation(ErrorKind::AlreadyFailed, "destroy", "cannot destroy a failed stream"))
            }
            SourcePhase::Ended => {
                return Err(violation(ErrorKind::AlreadyEnded, "destroy", "cannot destroy an ended stream"))
            }
            SourcePhase::Init | SourcePhase::Resumed | SourcePhase::Paused => {}
        }

        let _turn = shared.in_flight.enter(Operation::Destroy);
        shared.phase.set(SourcePhase::Destroyed);
        self.producer.destroy()
    }
}
