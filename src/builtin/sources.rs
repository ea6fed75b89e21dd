// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::{Cell, RefCell};

use crate::errors::StreamResult;
use crate::stream::{SourceFactory, SourceImpl, SourceOutput};

/// Emits `chunks` as a single batch on its first resume, then ends.
pub fn source_from_chunks<T: 'static>(chunks: Vec<T>) -> SourceFactory<T> {
    SourceFactory::new(move |output| ChunkSource {
        output,
        batches: RefCell::new(vec![chunks]),
        destroyed: Cell::new(false),
    })
}

/// Emits `data` split into pieces of at most `chunk_size` characters, all
/// in one batch, then ends. Without a chunk size the whole string is one
/// chunk.
pub fn source_from_string(data: impl Into<String>, chunk_size: Option<usize>) -> SourceFactory<String> {
    let data = data.into();
    let chunks = match chunk_size {
        Some(size) if size > 0 && size < data.chars().count() => {
            let chars: Vec<char> = data.chars().collect();
            chars.chunks(size).map(|piece| piece.iter().collect()).collect()
        }
        _ => vec![data],
    };
    source_from_chunks(chunks)
}

/// A source that fails with `error` as soon as it is opened.
pub fn error_source<T: 'static>(error: anyhow::Error) -> SourceFactory<T> {
    SourceFactory::try_new(move |output: SourceOutput<T>| {
        output.fail(error)?;
        Ok(Inert)
    })
}

struct ChunkSource<T> {
    output: SourceOutput<T>,
    batches: RefCell<Vec<Vec<T>>>,
    destroyed: Cell<bool>,
}

impl<T> SourceImpl for ChunkSource<T> {
    fn resume(&self) -> StreamResult {
        let batch = self.batches.borrow_mut().pop().unwrap_or_default();
        if !batch.is_empty() {
            self.output.next(batch)?;
            if self.destroyed.get() {
                return Ok(());
            }
        }
        self.output.end()
    }

    fn destroy(&self) -> StreamResult {
        self.destroyed.set(true);
        Ok(())
    }
}

struct Inert;

impl SourceImpl for Inert {
    fn resume(&self) -> StreamResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::stream::{SourceListener, SourcePhase};
    use anyhow::anyhow;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Log(Rc<RefCell<Vec<String>>>);

    impl Log {
        fn entries(&self) -> Vec<String> {
            self.0.borrow().clone()
        }
    }

    impl<T: std::fmt::Debug> SourceListener<T> for Log {
        fn on_next(&self, chunks: Vec<T>) -> StreamResult {
            self.0.borrow_mut().push(format!("next {chunks:?}"));
            Ok(())
        }

        fn on_end(&self) -> StreamResult {
            self.0.borrow_mut().push("end".into());
            Ok(())
        }

        fn on_fail(&self, error: anyhow::Error) -> StreamResult {
            self.0.borrow_mut().push(format!("fail {error}"));
            Ok(())
        }
    }

    #[test]
    fn chunks_are_delivered_once_then_end() {
        let log = Log::default();
        let source = source_from_chunks(vec!['a', 'b', 'c']).open(log.clone()).unwrap();

        source.resume().unwrap();
        assert_eq!(log.entries(), vec!["next ['a', 'b', 'c']", "end"]);
        assert_eq!(source.phase(), SourcePhase::Ended);

        let err = source.resume().unwrap_err();
        assert!(err.is(ErrorKind::AlreadyEnded));
    }

    #[test]
    fn factory_debug_reports_whether_it_was_opened() {
        let factory = source_from_chunks(vec![1u8]);
        assert!(format!("{factory:?}").contains("opened: false"));

        let _source = factory.open(Log::default()).unwrap();
        assert!(format!("{factory:?}").contains("opened: true"));
    }

    #[test]
    fn empty_chunks_only_end() {
        let log = Log::default();
        let source = source_from_chunks(Vec::<u8>::new()).open(log.clone()).unwrap();
        source.resume().unwrap();
        assert_eq!(log.entries(), vec!["end"]);
    }

    #[test]
    fn destroy_during_next_suppresses_end() {
        let slot: Rc<RefCell<Option<crate::stream::Source<u8>>>> = Rc::new(RefCell::new(None));
        let events = Rc::new(RefCell::new(Vec::new()));

        struct DestroyOnNext {
            slot: Rc<RefCell<Option<crate::stream::Source<u8>>>>,
            events: Rc<RefCell<Vec<&'static str>>>,
        }

        impl SourceListener<u8> for DestroyOnNext {
            fn on_next(&self, _chunks: Vec<u8>) -> StreamResult {
                self.events.borrow_mut().push("next");
                let source = self.slot.borrow().clone();
                match source {
                    Some(source) => source.destroy(),
                    None => Ok(()),
                }
            }

            fn on_end(&self) -> StreamResult {
                self.events.borrow_mut().push("end");
                Ok(())
            }

            fn on_fail(&self, _error: anyhow::Error) -> StreamResult {
                self.events.borrow_mut().push("fail");
                Ok(())
            }
        }

        let source = source_from_chunks(vec![1u8])
            .open(DestroyOnNext {
                slot: Rc::clone(&slot),
                events: Rc::clone(&events),
            })
            .unwrap();
        *slot.borrow_mut() = Some(source.clone());

        source.resume().unwrap();
        assert_eq!(*events.borrow(), vec!["next"]);
        assert_eq!(source.phase(), SourcePhase::Destroyed);
    }

    #[test]
    fn strings_split_by_chunk_size() {
        let log = Log::default();
        let source = source_from_string("abcde", Some(2)).open(log.clone()).unwrap();
        source.resume().unwrap();
        assert_eq!(log.entries(), vec![r#"next ["ab", "cd", "e"]"#, "end"]);
    }

    #[test]
    fn strings_without_chunk_size_stay_whole() {
        let log = Log::default();
        let source = source_from_string("hello", None).open(log.clone()).unwrap();
        source.resume().unwrap();
        assert_eq!(log.entries(), vec![r#"next ["hello"]"#, "end"]);
    }

    #[test]
    fn error_source_fails_at_open() {
        let log = Log::default();
        let source = error_source::<u8>(anyhow!("boom")).open(log.clone()).unwrap();
        assert_eq!(log.entries(), vec!["fail boom"]);
        assert_eq!(source.phase(), SourcePhase::Failed);
        assert!(source.resume().unwrap_err().is(ErrorKind::AlreadyFailed));
    }
}
