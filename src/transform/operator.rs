// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::errors::{ConfigError, StreamResult};
use crate::observability::messages::transform::{DrainSignaled, StageFailed, TurnDeferred};
use crate::observability::messages::StructuredLog;
use crate::stream::reentrancy::{InFlight, Operation};
use crate::stream::{DuplexFactory, DuplexImpl, DuplexOutput, FinishCompletion};
use crate::transform::{Scheduler, TaskId, TransformOptions, TransformStage};

/// Turns a [`TransformStage`] into a backpressured duplex.
///
/// Written chunks are queued and handed to the stage in turns of at most
/// `max_per_turn` chunks; leftovers are processed in continuations run by
/// `scheduler`. The options are validated before the factory is built.
pub fn buffering_transform<I, O, S>(
    stage: S,
    options: TransformOptions,
    scheduler: Rc<dyn Scheduler>,
) -> Result<DuplexFactory<I, O>, ConfigError>
where
    I: 'static,
    O: 'static,
    S: TransformStage<I, O> + 'static,
{
    options.validate()?;

    Ok(DuplexFactory::new(move |output| {
        TransformOperator(Rc::new_cyclic(|weak| TransformCore {
            weak: weak.clone(),
            output,
            stage: RefCell::new(Box::new(stage) as Box<dyn TransformStage<I, O>>),
            options,
            scheduler,
            buffer: RefCell::new(VecDeque::new()),
            ready: Cell::new(false),
            paused: Cell::new(false),
            started: Cell::new(false),
            finish_requested: Cell::new(false),
            ended: Cell::new(false),
            failed: Cell::new(false),
            destroyed: Cell::new(false),
            waits_for_drain: Cell::new(false),
            writing: InFlight::new(),
            pending_turn: Cell::new(None),
            done: RefCell::new(None),
        }))
    }))
}

struct TransformCore<I, O> {
    weak: Weak<TransformCore<I, O>>,
    output: DuplexOutput<O>,
    stage: RefCell<Box<dyn TransformStage<I, O>>>,
    options: TransformOptions,
    scheduler: Rc<dyn Scheduler>,
    buffer: RefCell<VecDeque<I>>,
    ready: Cell<bool>,
    paused: Cell<bool>,
    started: Cell<bool>,
    finish_requested: Cell<bool>,
    ended: Cell<bool>,
    failed: Cell<bool>,
    destroyed: Cell<bool>,
    waits_for_drain: Cell<bool>,
    writing: InFlight,
    pending_turn: Cell<Option<TaskId>>,
    done: RefCell<Option<FinishCompletion>>,
}

impl<I: 'static, O: 'static> TransformCore<I, O> {
    fn halted(&self) -> bool {
        self.destroyed.get() || self.failed.get()
    }

    fn buffered(&self) -> usize {
        self.buffer.borrow().len()
    }

    fn forward(&self, stage: &'static str, result: anyhow::Result<Vec<O>>) -> StreamResult {
        match result {
            Ok(chunks) if chunks.is_empty() => Ok(()),
            Ok(chunks) => self.output.next(chunks),
            Err(error) => {
                StageFailed {
                    stage,
                    error: &error,
                }
                .log();
                self.failed.set(true);
                self.output.fail(error)
            }
        }
    }

    fn maybe_send_next(&self) -> StreamResult {
        if self.halted() || self.ended.get() || !self.ready.get() || self.paused.get() {
            return Ok(());
        }

        if !self.started.get() {
            self.started.set(true);
            let result = self.stage.borrow_mut().start();
            self.forward("start", result)?;
            if self.halted() {
                return Ok(());
            }
        }

        let batch: Vec<I> = {
            let mut buffer = self.buffer.borrow_mut();
            let take = self.options.turn_size(buffer.len());
            buffer.drain(..take).collect()
        };

        if !batch.is_empty() {
            let result = self.stage.borrow_mut().transform(batch);
            self.forward("transform", result)?;
            if self.halted() {
                return Ok(());
            }
        }

        if self.buffered() > 0 && self.pending_turn.get().is_none() {
            self.schedule_turn();
        }

        // a write on the stack reports capacity through its own verdict
        if self.waits_for_drain.get() && !self.writing.contains(Operation::Write) && self.wants_data() {
            self.waits_for_drain.set(false);
            DrainSignaled {
                buffered: self.buffered(),
            }
            .log();
            self.output.drain()?;
        }

        // the drain may have re-entered and finished the stream already
        if self.halted() || self.ended.get() {
            return Ok(());
        }

        if self.buffered() == 0 && self.finish_requested.get() {
            let result = self.stage.borrow_mut().finish();
            self.forward("finish", result)?;
            if self.halted() {
                return Ok(());
            }

            self.ended.set(true);
            self.output.end()?;
            if self.destroyed.get() {
                return Ok(());
            }

            let done = self.done.borrow_mut().take();
            if let Some(done) = done {
                done.complete()?;
            }
        }

        Ok(())
    }

    fn wants_data(&self) -> bool {
        !self.paused.get() && self.buffered() < self.options.threshold_max
    }

    fn deferred(&self) -> TurnDeferred {
        TurnDeferred {
            buffered: self.buffered(),
            max_per_turn: self.options.max_per_turn.unwrap_or(usize::MAX),
        }
    }

    fn schedule_turn(&self) {
        self.deferred().log();

        let weak = self.weak.clone();
        let id = self.scheduler.schedule_once(Box::new(move || {
            let Some(core) = weak.upgrade() else {
                return Ok(());
            };
            core.pending_turn.set(None);

            let span = core.deferred().span("transform_turn");
            let _guard = span.enter();
            core.maybe_send_next()
        }));
        self.pending_turn.set(Some(id));
    }
}

struct TransformOperator<I, O>(Rc<TransformCore<I, O>>);

impl<I: 'static, O: 'static> DuplexImpl<I> for TransformOperator<I, O> {
    fn pause(&self) -> StreamResult {
        self.0.paused.set(true);
        Ok(())
    }

    fn resume(&self) -> StreamResult {
        let core = &self.0;
        core.ready.set(true);
        core.paused.set(false);
        core.maybe_send_next()
    }

    fn write(&self, chunks: Vec<I>) -> StreamResult<bool> {
        let core = &self.0;
        core.buffer.borrow_mut().extend(chunks);

        {
            let _writing = core.writing.enter(Operation::Write);
            core.maybe_send_next()?;
        }

        let ceiling = if core.waits_for_drain.get() {
            core.options.threshold_min
        } else {
            core.options.threshold_max
        };
        let takes_more = !core.paused.get() && core.buffered() < ceiling;
        core.waits_for_drain.set(!takes_more);

        Ok(takes_more)
    }

    fn finish(&self, done: FinishCompletion) -> StreamResult {
        let core = &self.0;
        core.finish_requested.set(true);
        core.waits_for_drain.set(false);
        *core.done.borrow_mut() = Some(done);
        core.maybe_send_next()
    }

    fn destroy(&self) -> StreamResult {
        let core = &self.0;
        core.destroyed.set(true);
        if let Some(id) = core.pending_turn.take() {
            core.scheduler.cancel(id);
        }
        Ok(())
    }
}
