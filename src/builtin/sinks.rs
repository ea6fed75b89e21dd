// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::RefCell;

use crate::errors::StreamResult;
use crate::stream::{FinishCompletion, SinkControl, SinkFactory, SinkImpl};

type WriteFn<T> = Box<dyn FnMut(Vec<T>) -> anyhow::Result<()>>;
type HookFn = Box<dyn FnOnce()>;

/// A sink that hands every batch to `write` and always takes more.
///
/// `finish` runs before the sink completes and `destroy` when it is
/// destroyed. An error from `write` fails the sink.
pub fn sync_sink<T, W, F, D>(write: W, finish: F, destroy: D) -> SinkFactory<T>
where
    T: 'static,
    W: FnMut(Vec<T>) -> anyhow::Result<()> + 'static,
    F: FnOnce() + 'static,
    D: FnOnce() + 'static,
{
    SinkFactory::new(move |control| SyncSink {
        control,
        write: RefCell::new(Box::new(write) as WriteFn<T>),
        finish: RefCell::new(Some(Box::new(finish) as HookFn)),
        destroy: RefCell::new(Some(Box::new(destroy) as HookFn)),
    })
}

/// Discards everything written to it.
pub fn null_sink<T: 'static>() -> SinkFactory<T> {
    sync_sink(|_chunks: Vec<T>| Ok(()), || {}, || {})
}

struct SyncSink<T> {
    control: SinkControl,
    write: RefCell<WriteFn<T>>,
    finish: RefCell<Option<HookFn>>,
    destroy: RefCell<Option<HookFn>>,
}

impl<T> SinkImpl<T> for SyncSink<T> {
    fn write(&self, chunks: Vec<T>) -> StreamResult<bool> {
        let result = (self.write.borrow_mut())(chunks);
        match result {
            Ok(()) => Ok(true),
            Err(error) => {
                self.control.fail(error)?;
                Ok(false)
            }
        }
    }

    fn finish(&self, done: FinishCompletion) -> StreamResult {
        let finish = self.finish.borrow_mut().take();
        if let Some(finish) = finish {
            finish();
        }
        done.complete()
    }

    fn destroy(&self) -> StreamResult {
        let destroy = self.destroy.borrow_mut().take();
        if let Some(destroy) = destroy {
            destroy();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::stream::{SinkListener, SinkPhase};
    use anyhow::anyhow;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Upstream {
        failures: Rc<RefCell<Vec<String>>>,
    }

    impl SinkListener for Upstream {
        fn on_drain(&self) -> StreamResult {
            Ok(())
        }

        fn on_fail(&self, error: anyhow::Error) -> StreamResult {
            self.failures.borrow_mut().push(error.to_string());
            Ok(())
        }
    }

    #[test]
    fn writes_reach_the_callback_and_finish_completes() {
        let written = Rc::new(RefCell::new(Vec::new()));
        let finished = Rc::new(Cell::new(false));
        let (w, f) = (Rc::clone(&written), Rc::clone(&finished));

        let sink = sync_sink(
            move |chunks: Vec<u32>| {
                w.borrow_mut().extend(chunks);
                Ok(())
            },
            move || f.set(true),
            || {},
        )
        .open(Upstream::default())
        .unwrap();

        assert!(sink.write(vec![1, 2]).unwrap());
        assert!(sink.write(vec![3]).unwrap());

        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        sink.finish(move || {
            d.set(true);
            Ok(())
        })
        .unwrap();

        assert_eq!(*written.borrow(), vec![1, 2, 3]);
        assert!(finished.get());
        assert!(done.get());
        assert_eq!(sink.phase(), SinkPhase::Finished);
    }

    #[test]
    fn write_error_fails_the_sink() {
        let upstream = Upstream::default();
        let sink = sync_sink(|_chunks: Vec<u32>| Err(anyhow!("disk full")), || {}, || {})
            .open(upstream.clone())
            .unwrap();

        assert!(!sink.write(vec![1]).unwrap());
        assert_eq!(sink.phase(), SinkPhase::Failed);
        assert_eq!(*upstream.failures.borrow(), vec!["disk full"]);
        assert!(sink.write(vec![2]).unwrap_err().is(ErrorKind::AlreadyFailed));
    }

    #[test]
    fn destroy_runs_the_hook_once() {
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let sink = sync_sink(|_chunks: Vec<u32>| Ok(()), || {}, move || c.set(c.get() + 1))
            .open(Upstream::default())
            .unwrap();

        sink.destroy(Some("test")).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(sink.destroy(None).unwrap_err().is(ErrorKind::AlreadyDestroyed));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn null_sink_accepts_and_finishes() {
        let sink = null_sink::<String>().open(Upstream::default()).unwrap();
        assert!(sink.write(vec!["ignored".to_string()]).unwrap());
        sink.finish(|| Ok(())).unwrap();
        assert_eq!(sink.phase(), SinkPhase::Finished);
    }
}
