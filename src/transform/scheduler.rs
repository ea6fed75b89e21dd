// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Deferred continuations for buffering transforms.
//!
//! A transform that cannot process its whole buffer in one turn hands the
//! rest of the work to a [`Scheduler`], which runs it after the current
//! synchronous call stack has unwound.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use tokio::task::JoinHandle;

use crate::errors::StreamResult;
use crate::observability::messages::transform::ContinuationFailed;
use crate::observability::messages::StructuredLog;

/// Work item run at most once by a scheduler.
pub type Continuation = Box<dyn FnOnce() -> StreamResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

pub trait Scheduler {
    /// Runs `task` once, after the caller has returned.
    fn schedule_once(&self, task: Continuation) -> TaskId;

    /// Drops a task that has not run yet. Unknown or finished ids are ignored.
    fn cancel(&self, id: TaskId);
}

/// FIFO scheduler that only runs tasks when asked to.
#[derive(Default)]
pub struct ManualScheduler {
    queue: RefCell<VecDeque<(TaskId, Continuation)>>,
    next_id: Cell<u64>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Runs the oldest queued task. `None` when the queue is empty.
    pub fn run_next(&self) -> Option<StreamResult> {
        let (_, task) = self.queue.borrow_mut().pop_front()?;
        Some(task())
    }

    /// Runs tasks, including ones scheduled meanwhile, until the queue is
    /// empty. Stops at the first failing task.
    pub fn run_until_idle(&self) -> StreamResult<usize> {
        let mut ran = 0;
        while let Some(result) = self.run_next() {
            result?;
            ran += 1;
        }
        Ok(ran)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, task: Continuation) -> TaskId {
        let id = TaskId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.queue.borrow_mut().push_back((id, task));
        id
    }

    fn cancel(&self, id: TaskId) {
        self.queue.borrow_mut().retain(|(queued, _)| *queued != id);
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Runs continuations as local tokio tasks.
///
/// Must be used from within a `tokio::task::LocalSet`; continuations are not
/// `Send`. A continuation that returns an error has nobody to report to and
/// is logged instead.
#[derive(Default)]
pub struct TokioScheduler {
    tasks: Rc<RefCell<HashMap<TaskId, JoinHandle<()>>>>,
    next_id: Cell<u64>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, task: Continuation) -> TaskId {
        let id = TaskId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let tasks = Rc::clone(&self.tasks);
        let handle = tokio::task::spawn_local(async move {
            tasks.borrow_mut().remove(&id);
            if let Err(error) = task() {
                ContinuationFailed {
                    task: id,
                    error: &error,
                }
                .log();
            }
        });

        self.tasks.borrow_mut().insert(id, handle);
        id
    }

    fn cancel(&self, id: TaskId) {
        let handle = self.tasks.borrow_mut().remove(&id);
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
