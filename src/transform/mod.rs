// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Buffering transform operator.
//!
//! [`buffering_transform`] wraps a synchronous [`TransformStage`] into a
//! duplex that queues its input, processes it in bounded turns and applies
//! hysteresis to its drain signaling.

mod operator;
mod options;
mod scheduler;


pub use operator::buffering_transform;
pub use options::TransformOptions;
pub use scheduler::{Continuation, ManualScheduler, Scheduler, TaskId, TokioScheduler};

/// Synchronous processing logic of a buffering transform.
///
/// Each hook returns either output chunks (possibly none) or the error the
/// transform stream fails with.
pub trait TransformStage<I, O> {
    /// Runs once, on the first turn after the stream was resumed.
    fn start(&mut self) -> anyhow::Result<Vec<O>> {
        Ok(Vec::new())
    }

    fn transform(&mut self, chunks: Vec<I>) -> anyhow::Result<Vec<O>>;

    /// Runs once the input has finished and the buffer is empty, right
    /// before the stream ends.
    fn finish(&mut self) -> anyhow::Result<Vec<O>> {
        Ok(Vec::new())
    }
}

impl<I, O, F> TransformStage<I, O> for F
where
    F: FnMut(Vec<I>) -> anyhow::Result<Vec<O>>,
{
    fn transform(&mut self, chunks: Vec<I>) -> anyhow::Result<Vec<O>> {
        self(chunks)
    }
}
