// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::errors::{ErrorKind, StreamError, StreamResult, UsageFault};
use crate::stream::reentrancy::{InFlight, Operation};
use crate::stream::{DoneCallback, FactoryId, FinishCompletion, LogLevel, StreamLogger};

/// Phase of a sink stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkPhase {
    Open,
    Finishing,
    Finished,
    Failed,
    Destroyed,
}

impl SinkPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SinkPhase::Finished | SinkPhase::Failed | SinkPhase::Destroyed)
    }
}

/// Consumer logic behind a sink.
pub trait SinkImpl<T> {
    /// Accepts a batch and reports whether the sink takes more right away.
    /// Returning `false` promises a later `drain` on the sink's control.
    fn write(&self, chunks: Vec<T>) -> StreamResult<bool>;

    /// Begins finishing; the sink is finished once `done` is completed.
    fn finish(&self, done: FinishCompletion) -> StreamResult;

    fn destroy(&self) -> StreamResult {
        Ok(())
    }
}

/// Producer-side callbacks receiving what a sink signals upstream.
pub trait SinkListener {
    fn on_drain(&self) -> StreamResult;
    fn on_fail(&self, error: anyhow::Error) -> StreamResult;
}

type SinkOpener<T> = Box<dyn FnOnce(SinkControl) -> StreamResult<Rc<dyn SinkImpl<T>>>>;
type LoggerSlot = Rc<OnceCell<Rc<dyn StreamLogger>>>;

struct SinkFactoryInner<T> {
    id: FactoryId,
    opener: RefCell<Option<SinkOpener<T>>>,
    logger: LoggerSlot,
}

/// Blueprint for a single sink stream.
pub struct SinkFactory<T> {
    inner: Rc<SinkFactoryInner<T>>,
}

impl<T> Clone for SinkFactory<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> fmt::Debug for SinkFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkFactory")
            .field("id", &self.inner.id)
            .field("opened", &self.is_opened())
            .field("logged", &self.inner.logger.get().is_some())
            .finish()
    }
}

impl<T: 'static> SinkFactory<T> {
    pub fn new<I, F>(open: F) -> Self
    where
        I: SinkImpl<T> + 'static,
        F: FnOnce(SinkControl) -> I + 'static,
    {
        Self::try_new(move |control| Ok(open(control)))
    }

    pub fn try_new<I, F>(open: F) -> Self
    where
        I: SinkImpl<T> + 'static,
        F: FnOnce(SinkControl) -> StreamResult<I> + 'static,
    {
        let opener: SinkOpener<T> =
            Box::new(move |control| open(control).map(|imp| Rc::new(imp) as Rc<dyn SinkImpl<T>>));

        Self {
            inner: Rc::new(SinkFactoryInner {
                id: FactoryId::next(),
                opener: RefCell::new(Some(opener)),
                logger: Rc::new(OnceCell::new()),
            }),
        }
    }

    pub fn id(&self) -> FactoryId {
        self.inner.id
    }

    pub fn is_opened(&self) -> bool {
        self.inner.opener.borrow().is_none()
    }

    /// Attaches a lifecycle logger. A factory takes at most one logger.
    pub fn with_logger(&self, logger: Rc<dyn StreamLogger>) -> StreamResult<Self> {
        self.inner
            .logger
            .set(logger)
            .map_err(|_| StreamError::usage(UsageFault::LoggerAlreadyAttached, "with_logger"))?;
        Ok(self.clone())
    }

    pub fn open<L>(&self, listener: L) -> StreamResult<Sink<T>>
    where
        L: SinkListener + 'static,
    {
        let opener = self.inner.opener.borrow_mut().take().ok_or_else(|| {
            StreamError::new(
                ErrorKind::AlreadyOpened,
                "open",
                "cannot open a stream that is already open",
            )
        })?;

        let shared = Rc::new(SinkShared {
            id: self.inner.id,
            phase: Cell::new(SinkPhase::Open),
            in_flight: InFlight::new(),
            listener: Box::new(listener),
            logger: Rc::clone(&self.inner.logger),
        });

        shared.log(LogLevel::Info, || "open".to_string());
        let consumer = opener(SinkControl {
            shared: Rc::clone(&shared),
        })?;

        Ok(Sink { shared, consumer })
    }
}

struct SinkShared {
    id: FactoryId,
    phase: Cell<SinkPhase>,
    in_flight: InFlight,
    listener: Box<dyn SinkListener>,
    logger: LoggerSlot,
}

impl SinkShared {
    fn log(&self, level: LogLevel, message: impl FnOnce() -> String) {
        if let Some(logger) = self.logger.get() {
            logger.log(level, &message());
        }
    }

    /// Rejects with a logged violation; used where a misbehaving sink
    /// implementation is the likely culprit.
    fn reject_logged(&self, kind: ErrorKind, operation: &'static str, message: &str) -> StreamError {
        self.log(LogLevel::Error, || format!("{operation}: {message}"));
        StreamError::new(kind, operation, message)
    }

    fn complete_finish(&self, done: DoneCallback) -> StreamResult {
        match self.phase.get() {
            SinkPhase::Failed => {
                return Err(self.reject_logged(ErrorKind::AlreadyFailed, "finish", "cannot finish a failed stream"))
            }
            SinkPhase::Destroyed => {
                return Err(self.reject_logged(
                    ErrorKind::AlreadyDestroyed,
                    "finish",
                    "cannot finish a destroyed stream",
                ))
            }
            SinkPhase::Finished => return Err(StreamError::usage(UsageFault::AlreadyCompleted, "finish")),
            SinkPhase::Open | SinkPhase::Finishing => {}
        }

        self.log(LogLevel::Info, || "finish done".to_string());
        self.phase.set(SinkPhase::Finished);
        done()
    }
}

fn violation(kind: ErrorKind, operation: &'static str, message: &str) -> StreamError {
    StreamError::new(kind, operation, message)
}

/// Guarded upstream signalling handle given to the sink implementation.
#[derive(Clone)]
pub struct SinkControl {
    shared: Rc<SinkShared>,
}

impl SinkControl {
    pub fn drain(&self) -> StreamResult {
        let shared = &self.shared;

        match shared.phase.get() {
            SinkPhase::Failed => {
                return Err(violation(ErrorKind::AlreadyFailed, "drain", "cannot drain a stream that is already failed"))
            }
            SinkPhase::Destroyed => {
                return Err(violation(
                    ErrorKind::AlreadyDestroyed,
                    "drain",
                    "cannot drain a stream that is already destroyed",
                ))
            }
            SinkPhase::Finishing => {
                return Err(violation(ErrorKind::AlreadyFinishing, "drain", "cannot drain a stream that is finishing"))
            }
            SinkPhase::Finished => {
                return Err(violation(
                    ErrorKind::AlreadyFinished,
                    "drain",
                    "cannot drain a stream that is already finished",
                ))
            }
            SinkPhase::Open => {}
        }

        shared.log(LogLevel::Info, || "drain".to_string());

        if shared.in_flight.contains(Operation::Drain) {
            return Err(violation(ErrorKind::Reentrancy, "drain", "reentrancy detected"));
        }

        if shared.in_flight.contains(Operation::Write) {
            return Err(violation(ErrorKind::DrainDuringWrite, "drain", "cannot drain during write"));
        }

        let _turn = shared.in_flight.enter(Operation::Drain);
        shared.listener.on_drain()
    }

    pub fn fail(&self, error: anyhow::Error) -> StreamResult {
        let shared = &self.shared;

        match shared.phase.get() {
            SinkPhase::Failed => {
                return Err(violation(ErrorKind::AlreadyFailed, "fail", "cannot fail a stream that is already failed"))
            }
            SinkPhase::Destroyed => {
                return Err(violation(
                    ErrorKind::AlreadyDestroyed,
                    "fail",
                    "cannot fail a stream that is already destroyed",
                ))
            }
            SinkPhase::Finished => {
                return Err(violation(
                    ErrorKind::AlreadyFinished,
                    "fail",
                    "cannot fail a stream that is already finished",
                ))
            }
            SinkPhase::Open | SinkPhase::Finishing => {}
        }

        shared.log(LogLevel::Info, || format!("fail with error: {error}"));

        shared.phase.set(SinkPhase::Failed);
        shared.listener.on_fail(error)
    }
}

/// Guarded producer-facing handle of an opened sink.
pub struct Sink<T> {
    shared: Rc<SinkShared>,
    consumer: Rc<dyn SinkImpl<T>>,
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            consumer: Rc::clone(&self.consumer),
        }
    }
}

impl<T> fmt::Debug for Sink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("id", &self.shared.id)
            .field("phase", &self.shared.phase.get())
            .finish()
    }
}

impl<T> Sink<T> {
    pub fn id(&self) -> FactoryId {
        self.shared.id
    }

    pub fn phase(&self) -> SinkPhase {
        self.shared.phase.get()
    }

    pub fn in_flight(&self, op: Operation) -> bool {
        self.shared.in_flight.contains(op)
    }

    /// Writes a batch. Returns whether the sink takes more right away.
    pub fn write(&self, chunks: Vec<T>) -> StreamResult<bool> {
        let shared = &self.shared;

        match shared.phase.get() {
            SinkPhase::Failed => {
                return Err(violation(ErrorKind::AlreadyFailed, "write", "cannot write to a failed stream"))
            }
            SinkPhase::Destroyed => {
                return Err(violation(ErrorKind::AlreadyDestroyed, "write", "cannot write to a destroyed stream"))
            }
            SinkPhase::Finishing => {
                return Err(violation(
                    ErrorKind::AlreadyFinishing,
                    "write",
                    "cannot write to a stream that is finishing",
                ))
            }
            SinkPhase::Finished => {
                return Err(violation(ErrorKind::AlreadyFinished, "write", "cannot write to a finished stream"))
            }
            SinkPhase::Open => {}
        }

        shared.log(LogLevel::Info, || format!("write {} chunks", chunks.len()));

        if shared.in_flight.contains(Operation::Write) {
            return Err(violation(ErrorKind::Reentrancy, "write", "reentrancy detected"));
        }

        let _turn = shared.in_flight.enter(Operation::Write);
        self.consumer.write(chunks)
    }

    pub fn finish(&self, done: impl FnOnce() -> StreamResult + 'static) -> StreamResult {
        let shared = &self.shared;

        match shared.phase.get() {
            SinkPhase::Failed => {
                return Err(violation(ErrorKind::AlreadyFailed, "finish", "cannot finish a failed stream"))
            }
            SinkPhase::Destroyed => {
                return Err(violation(ErrorKind::AlreadyDestroyed, "finish", "cannot finish a destroyed stream"))
            }
            SinkPhase::Finishing => {
                return Err(violation(
                    ErrorKind::AlreadyFinishing,
                    "finish",
                    "cannot finish a stream that is already finishing",
                ))
            }
            SinkPhase::Finished => {
                return Err(violation(
                    ErrorKind::AlreadyFinished,
                    "finish",
                    "cannot finish an already finished stream",
                ))
            }
            SinkPhase::Open => {}
        }

        if shared.in_flight.contains(Operation::Write) {
            return Err(violation(ErrorKind::Reentrancy, "finish", "reentrancy (write) detected"));
        }

        shared.log(LogLevel::Info, || "finish".to_string());

        let done: DoneCallback = Box::new(done);
        let completion = {
            let shared = Rc::clone(shared);
            FinishCompletion::new(move || shared.complete_finish(done))
        };

        shared.phase.set(SinkPhase::Finishing);
        self.consumer.finish(completion)
    }

    /// Destroys the sink. `reason` is only reported to the logger.
    pub fn destroy(&self, reason: Option<&str>) -> StreamResult {
        let shared = &self.shared;

        match shared.phase.get() {
            SinkPhase::Failed => {
                return Err(violation(ErrorKind::AlreadyFailed, "destroy", "cannot destroy a failed stream"))
            }
            SinkPhase::Destroyed => {
                return Err(violation(ErrorKind::AlreadyDestroyed, "destroy", "cannot destroy a destroyed stream"))
            }
            SinkPhase::Finished => {
                return Err(violation(ErrorKind::AlreadyFinished, "destroy", "cannot destroy a finished stream"))
            }
            SinkPhase::Open | SinkPhase::Finishing => {}
        }

        shared.log(LogLevel::Info, || {
            format!("destroy, reason: {}", reason.unwrap_or("unknown"))
        });

        let _turn = shared.in_flight.enter(Operation::Destroy);
        shared.phase.set(SinkPhase::Destroyed);
        self.consumer.destroy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    type WriteHook = Box<dyn Fn(&SinkControl) -> StreamResult>;

    #[derive(Default)]
    struct ConsumerState {
        written: RefCell<Vec<u32>>,
        takes_more: Cell<bool>,
        pending: RefCell<Option<FinishCompletion>>,
        defer_finish: Cell<bool>,
        destroys: Cell<usize>,
        on_write: RefCell<Option<WriteHook>>,
        control: RefCell<Option<SinkControl>>,
    }

    struct TestConsumer(Rc<ConsumerState>);

    impl SinkImpl<u32> for TestConsumer {
        fn write(&self, chunks: Vec<u32>) -> StreamResult<bool> {
            self.0.written.borrow_mut().extend(chunks);
            let hook = self.0.on_write.borrow_mut().take();
            let control = self.0.control.borrow().clone();
            if let (Some(hook), Some(control)) = (hook, control) {
                hook(&control)?;
            }
            Ok(self.0.takes_more.get())
        }

        fn finish(&self, done: FinishCompletion) -> StreamResult {
            if self.0.defer_finish.get() {
                *self.0.pending.borrow_mut() = Some(done);
                Ok(())
            } else {
                done.complete()
            }
        }

        fn destroy(&self) -> StreamResult {
            self.0.destroys.set(self.0.destroys.get() + 1);
            Ok(())
        }
    }

    #[derive(Default)]
    struct ProducerLog {
        drains: Cell<usize>,
        failures: RefCell<Vec<String>>,
        on_drain: RefCell<Option<Box<dyn Fn() -> StreamResult>>>,
    }

    struct TestListener(Rc<ProducerLog>);

    impl SinkListener for TestListener {
        fn on_drain(&self) -> StreamResult {
            self.0.drains.set(self.0.drains.get() + 1);
            let hook = self.0.on_drain.borrow_mut().take();
            match hook {
                Some(hook) => hook(),
                None => Ok(()),
            }
        }

        fn on_fail(&self, error: anyhow::Error) -> StreamResult {
            self.0.failures.borrow_mut().push(error.to_string());
            Ok(())
        }
    }

    struct Fixture {
        sink: Sink<u32>,
        control: SinkControl,
        consumer: Rc<ConsumerState>,
        producer: Rc<ProducerLog>,
        logs: Rc<RefCell<Vec<(LogLevel, String)>>>,
    }

    fn fixture() -> Fixture {
        let consumer = Rc::new(ConsumerState {
            takes_more: Cell::new(true),
            ..ConsumerState::default()
        });
        let logs: Rc<RefCell<Vec<(LogLevel, String)>>> = Rc::default();

        let factory = {
            let consumer = Rc::clone(&consumer);
            SinkFactory::new(move |control| {
                *consumer.control.borrow_mut() = Some(control);
                TestConsumer(consumer)
            })
        };
        let sink_logs = Rc::clone(&logs);
        let factory = factory
            .with_logger(Rc::new(move |level: LogLevel, message: &str| {
                sink_logs.borrow_mut().push((level, message.to_string()));
            }))
            .unwrap();

        let producer = Rc::new(ProducerLog::default());
        let sink = factory.open(TestListener(Rc::clone(&producer))).unwrap();
        let control = consumer.control.borrow().clone().unwrap();

        Fixture {
            sink,
            control,
            consumer,
            producer,
            logs,
        }
    }

    fn kind_of<T: fmt::Debug>(result: StreamResult<T>) -> ErrorKind {
        result.unwrap_err().kind()
    }

    fn finishing() -> Fixture {
        let f = fixture();
        f.consumer.defer_finish.set(true);
        f.sink.finish(|| Ok(())).unwrap();
        f
    }

    fn finished() -> Fixture {
        let f = fixture();
        f.sink.finish(|| Ok(())).unwrap();
        f
    }

    #[test]
    fn open_sink_accepts_writes_and_reports_capacity() {
        let f = fixture();
        assert!(f.sink.write(vec![1, 2]).unwrap());
        f.consumer.takes_more.set(false);
        assert!(!f.sink.write(vec![3]).unwrap());
        assert_eq!(f.consumer.written.borrow().as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn finish_completes_synchronously_and_runs_done() {
        let f = fixture();
        let done = Rc::new(Cell::new(false));
        let flag = Rc::clone(&done);
        f.sink
            .finish(move || {
                flag.set(true);
                Ok(())
            })
            .unwrap();

        assert!(done.get());
        assert_eq!(f.sink.phase(), SinkPhase::Finished);
    }

    #[test]
    fn finishing_state_rejects_data_and_drain() {
        let f = finishing();
        assert_eq!(f.sink.phase(), SinkPhase::Finishing);
        assert_eq!(kind_of(f.sink.write(vec![1])), ErrorKind::AlreadyFinishing);
        assert_eq!(kind_of(f.sink.finish(|| Ok(()))), ErrorKind::AlreadyFinishing);
        assert_eq!(kind_of(f.control.drain()), ErrorKind::AlreadyFinishing);

        let pending = f.consumer.pending.borrow_mut().take().unwrap();
        pending.complete().unwrap();
        assert_eq!(f.sink.phase(), SinkPhase::Finished);
    }

    #[test]
    fn finishing_sink_may_still_be_destroyed_or_fail() {
        let f = finishing();
        f.sink.destroy(Some("shutdown")).unwrap();
        assert_eq!(f.consumer.destroys.get(), 1);

        let pending = f.consumer.pending.borrow_mut().take().unwrap();
        assert_eq!(kind_of(pending.complete()), ErrorKind::AlreadyDestroyed);

        let f = finishing();
        f.control.fail(anyhow!("disk full")).unwrap();
        let pending = f.consumer.pending.borrow_mut().take().unwrap();
        assert_eq!(kind_of(pending.complete()), ErrorKind::AlreadyFailed);
        assert!(f
            .logs
            .borrow()
            .iter()
            .any(|(level, message)| *level == LogLevel::Error
                && message == "finish: cannot finish a failed stream"));
    }

    #[test]
    fn finished_state_rejects_everything() {
        let f = finished();
        assert_eq!(kind_of(f.sink.write(vec![1])), ErrorKind::AlreadyFinished);
        assert_eq!(kind_of(f.sink.finish(|| Ok(()))), ErrorKind::AlreadyFinished);
        assert_eq!(kind_of(f.sink.destroy(None)), ErrorKind::AlreadyFinished);
        assert_eq!(kind_of(f.control.drain()), ErrorKind::AlreadyFinished);
        assert_eq!(kind_of(f.control.fail(anyhow!("x"))), ErrorKind::AlreadyFinished);
    }

    #[test]
    fn failed_state_rejects_everything() {
        let f = fixture();
        f.control.fail(anyhow!("boom")).unwrap();
        assert_eq!(f.producer.failures.borrow().as_slice(), &["boom".to_string()]);

        assert_eq!(kind_of(f.sink.write(vec![1])), ErrorKind::AlreadyFailed);
        assert_eq!(kind_of(f.sink.finish(|| Ok(()))), ErrorKind::AlreadyFailed);
        assert_eq!(kind_of(f.sink.destroy(None)), ErrorKind::AlreadyFailed);
        assert_eq!(kind_of(f.control.drain()), ErrorKind::AlreadyFailed);
        assert_eq!(kind_of(f.control.fail(anyhow!("x"))), ErrorKind::AlreadyFailed);
    }

    #[test]
    fn destroyed_state_rejects_everything() {
        let f = fixture();
        f.sink.destroy(None).unwrap();

        assert_eq!(kind_of(f.sink.write(vec![1])), ErrorKind::AlreadyDestroyed);
        assert_eq!(kind_of(f.sink.finish(|| Ok(()))), ErrorKind::AlreadyDestroyed);
        assert_eq!(kind_of(f.sink.destroy(None)), ErrorKind::AlreadyDestroyed);
        assert_eq!(kind_of(f.control.drain()), ErrorKind::AlreadyDestroyed);
        assert_eq!(kind_of(f.control.fail(anyhow!("x"))), ErrorKind::AlreadyDestroyed);
        assert_eq!(f.consumer.destroys.get(), 1);
    }

    #[test]
    fn drain_inside_write_is_rejected() {
        let f = fixture();
        *f.consumer.on_write.borrow_mut() = Some(Box::new(|control| control.drain()));
        assert_eq!(kind_of(f.sink.write(vec![1])), ErrorKind::DrainDuringWrite);
        assert!(!f.sink.in_flight(Operation::Write));
        assert_eq!(f.producer.drains.get(), 0);
    }

    #[test]
    fn write_inside_drain_is_allowed_but_drain_inside_drain_is_not() {
        let f = fixture();
        let sink = f.sink.clone();
        *f.producer.on_drain.borrow_mut() = Some(Box::new(move || sink.write(vec![7]).map(|_| ())));
        f.control.drain().unwrap();
        assert_eq!(f.consumer.written.borrow().as_slice(), &[7]);

        let f = fixture();
        let control = f.control.clone();
        *f.producer.on_drain.borrow_mut() = Some(Box::new(move || control.drain()));
        assert_eq!(kind_of(f.control.drain()), ErrorKind::Reentrancy);
    }

    struct FinishingOnWrite {
        sink: RefCell<Option<Sink<u32>>>,
    }

    impl SinkImpl<u32> for FinishingOnWrite {
        fn write(&self, _chunks: Vec<u32>) -> StreamResult<bool> {
            let sink = self.sink.borrow().clone();
            match sink {
                Some(sink) => sink.finish(|| Ok(())).map(|_| true),
                None => Ok(true),
            }
        }

        fn finish(&self, done: FinishCompletion) -> StreamResult {
            done.complete()
        }
    }

    #[test]
    fn finish_inside_write_is_rejected() {
        let state = Rc::new(FinishingOnWrite {
            sink: RefCell::new(None),
        });

        struct Delegate(Rc<FinishingOnWrite>);
        impl SinkImpl<u32> for Delegate {
            fn write(&self, chunks: Vec<u32>) -> StreamResult<bool> {
                self.0.write(chunks)
            }
            fn finish(&self, done: FinishCompletion) -> StreamResult {
                self.0.finish(done)
            }
        }

        let factory = {
            let state = Rc::clone(&state);
            SinkFactory::new(move |_control| Delegate(state))
        };
        let sink = factory.open(TestListener(Rc::default())).unwrap();
        *state.sink.borrow_mut() = Some(sink.clone());

        assert_eq!(kind_of(sink.write(vec![1])), ErrorKind::Reentrancy);
        assert_eq!(sink.phase(), SinkPhase::Open);
    }

    #[test]
    fn logger_sees_lifecycle_in_order() {
        let f = fixture();
        f.sink.write(vec![1, 2, 3]).unwrap();
        f.control.drain().unwrap();
        f.sink.destroy(None).unwrap();

        let messages: Vec<String> = f.logs.borrow().iter().map(|(_, m)| m.clone()).collect();
        assert_eq!(
            messages,
            vec!["open", "write 3 chunks", "drain", "destroy, reason: unknown"]
        );
    }

    #[test]
    fn logger_can_only_be_attached_once() {
        let factory: SinkFactory<u32> = SinkFactory::new(|_control| TestConsumer(Rc::default()));
        factory.with_logger(Rc::new(|_: LogLevel, _: &str| {})).unwrap();
        let err = factory
            .with_logger(Rc::new(|_: LogLevel, _: &str| {}))
            .unwrap_err();
        assert!(err.is(ErrorKind::Usage(UsageFault::LoggerAlreadyAttached)));
    }

    #[test]
    fn opening_twice_is_rejected() {
        let factory: SinkFactory<u32> = SinkFactory::new(|_control| TestConsumer(Rc::default()));
        factory.open(TestListener(Rc::default())).unwrap();
        assert_eq!(
            kind_of(factory.open(TestListener(Rc::default()))),
            ErrorKind::AlreadyOpened
        );
    }
}
