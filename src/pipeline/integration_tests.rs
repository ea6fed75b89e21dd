// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use anyhow::anyhow;

    use crate::builtin::{error_source, source_from_chunks, sync_sink};
    use crate::errors::{ErrorKind, StreamResult, UsageFault};
    use crate::pipeline::{
        create_linear, pipeline_sink, pipeline_source, pipeline_transform, Connection, NetworkCallbacks,
        NetworkStream, PipelineNetwork, Wiring,
    };
    use crate::stream::{
        DuplexFactory, DuplexImpl, FinishCompletion, SinkControl, SinkFactory, SinkImpl, SourceFactory,
        SourceImpl, SourceOutput,
    };
    use crate::transform::{buffering_transform, ManualScheduler, Scheduler, TransformOptions};

    /// Shared event log for probe streams.
    #[derive(Clone, Default)]
    struct Probe(Rc<RefCell<Vec<String>>>);

    impl Probe {
        fn record(&self, event: impl Into<String>) {
            self.0.borrow_mut().push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.0.borrow().clone()
        }

        fn count(&self, event: &str) -> usize {
            self.0.borrow().iter().filter(|e| *e == event).count()
        }
    }

    /// Outcome of a started network.
    #[derive(Clone, Default)]
    struct Outcome {
        done: Rc<Cell<usize>>,
        failures: Rc<RefCell<Vec<String>>>,
    }

    impl Outcome {
        fn callbacks(&self) -> NetworkCallbacks {
            let done = Rc::clone(&self.done);
            let failures = Rc::clone(&self.failures);
            NetworkCallbacks::new(
                move || {
                    done.set(done.get() + 1);
                    Ok(())
                },
                move |error| {
                    failures.borrow_mut().push(error.to_string());
                    Ok(())
                },
            )
        }

        fn done(&self) -> usize {
            self.done.get()
        }

        fn failures(&self) -> Vec<String> {
            self.failures.borrow().clone()
        }
    }

    type OutputSlot = Rc<RefCell<Option<SourceOutput<u32>>>>;
    type ControlSlot = Rc<RefCell<Option<SinkControl>>>;

    struct ManualSource {
        label: &'static str,
        probe: Probe,
    }

    impl SourceImpl for ManualSource {
        fn pause(&self) -> StreamResult {
            self.probe.record(format!("{} pause", self.label));
            Ok(())
        }

        fn resume(&self) -> StreamResult {
            self.probe.record(format!("{} resume", self.label));
            Ok(())
        }

        fn destroy(&self) -> StreamResult {
            self.probe.record(format!("{} destroy", self.label));
            Ok(())
        }
    }

    /// A source driven by the test through its captured output.
    fn manual_source(label: &'static str, probe: &Probe) -> (SourceFactory<u32>, OutputSlot) {
        let slot: OutputSlot = Rc::new(RefCell::new(None));
        let captured = Rc::clone(&slot);
        let probe = probe.clone();
        let factory = SourceFactory::new(move |output| {
            *captured.borrow_mut() = Some(output);
            ManualSource { label, probe }
        });
        (factory, slot)
    }

    fn emit(slot: &OutputSlot) -> SourceOutput<u32> {
        slot.borrow().clone().unwrap()
    }

    struct ProbeSink {
        label: &'static str,
        probe: Probe,
        takes_more: Rc<Cell<bool>>,
    }

    impl SinkImpl<u32> for ProbeSink {
        fn write(&self, chunks: Vec<u32>) -> StreamResult<bool> {
            self.probe.record(format!("{} write {:?}", self.label, chunks));
            Ok(self.takes_more.get())
        }

        fn finish(&self, done: FinishCompletion) -> StreamResult {
            self.probe.record(format!("{} finish", self.label));
            done.complete()
        }

        fn destroy(&self) -> StreamResult {
            self.probe.record(format!("{} destroy", self.label));
            Ok(())
        }
    }

    /// A sink whose capacity verdict the test controls.
    fn probe_sink(label: &'static str, probe: &Probe, takes_more: bool) -> (SinkFactory<u32>, ControlSlot) {
        let slot: ControlSlot = Rc::new(RefCell::new(None));
        let captured = Rc::clone(&slot);
        let probe = probe.clone();
        let factory = SinkFactory::new(move |control| {
            *captured.borrow_mut() = Some(control);
            ProbeSink {
                label,
                probe,
                takes_more: Rc::new(Cell::new(takes_more)),
            }
        });
        (factory, slot)
    }

    fn control(slot: &ControlSlot) -> SinkControl {
        slot.borrow().clone().unwrap()
    }

    fn collecting_sink() -> (SinkFactory<u32>, Rc<RefCell<Vec<u32>>>) {
        let collected = Rc::new(RefCell::new(Vec::new()));
        let target = Rc::clone(&collected);
        let sink = sync_sink(
            move |chunks: Vec<u32>| {
                target.borrow_mut().extend(chunks);
                Ok(())
            },
            || {},
            || {},
        );
        (sink, collected)
    }

    struct ProbeDuplex {
        probe: Probe,
    }

    impl DuplexImpl<u32> for ProbeDuplex {
        fn resume(&self) -> StreamResult {
            self.probe.record("duplex resume");
            Ok(())
        }

        fn write(&self, chunks: Vec<u32>) -> StreamResult<bool> {
            self.probe.record(format!("duplex write {:?}", chunks));
            Ok(true)
        }

        fn finish(&self, done: FinishCompletion) -> StreamResult {
            done.complete()
        }

        fn destroy(&self) -> StreamResult {
            self.probe.record("duplex destroy");
            Ok(())
        }
    }

    fn doubling(chunks: Vec<u32>) -> anyhow::Result<Vec<u32>> {
        Ok(chunks.into_iter().map(|c| c * 2).collect())
    }

    #[test]
    fn test_linear_network_delivers_and_completes_once() {
        let (sink, collected) = collecting_sink();
        let network = create_linear(source_from_chunks(vec![1, 2, 3]), vec![], sink).unwrap();
        let outcome = Outcome::default();

        let _stream = network.stream(outcome.callbacks()).unwrap();

        assert_eq!(*collected.borrow(), vec![1, 2, 3]);
        assert_eq!(outcome.done(), 1);
        assert!(outcome.failures().is_empty());
    }

    #[test]
    fn test_streaming_twice_is_rejected() {
        let network = create_linear(source_from_chunks(vec![1]), vec![], collecting_sink().0).unwrap();
        let outcome = Outcome::default();
        let _stream = network.stream(outcome.callbacks()).unwrap();

        let err = network.stream(outcome.callbacks()).err().unwrap();
        assert!(err.is(ErrorKind::Usage(UsageFault::NetworkAlreadyStarted)));
    }

    /// Wiring before start is only recorded; streams open on start
    #[test]
    fn test_streams_open_only_when_started() {
        let source = source_from_chunks(vec![1]);
        let (sink, _) = collecting_sink();
        let network = create_linear(source.clone(), vec![], sink.clone()).unwrap();

        assert!(!source.is_opened());
        assert!(network.connections().is_empty());

        let _stream = network.stream(Outcome::default().callbacks()).unwrap();
        assert!(source.is_opened());
        assert!(sink.is_opened());
        assert_eq!(
            network.connections(),
            vec![Connection {
                source: source.id(),
                sink: sink.id()
            }]
        );
    }

    #[test]
    fn test_transform_in_network_runs_deferred_turns() {
        let scheduler = Rc::new(ManualScheduler::new());
        let options = TransformOptions::default().with_max_per_turn(2);
        let transform =
            buffering_transform(doubling, options, Rc::clone(&scheduler) as Rc<dyn Scheduler>).unwrap();
        let (sink, collected) = collecting_sink();

        let network = create_linear(source_from_chunks(vec![1, 2, 3, 4, 5]), vec![transform], sink).unwrap();
        let outcome = Outcome::default();
        let _stream = network.stream(outcome.callbacks()).unwrap();

        assert_eq!(*collected.borrow(), vec![2, 4]);
        assert_eq!(outcome.done(), 0);

        assert_eq!(scheduler.run_until_idle().unwrap(), 2);
        assert_eq!(*collected.borrow(), vec![2, 4, 6, 8, 10]);
        assert_eq!(outcome.done(), 1);
    }

    /// A source feeding two sinks pauses while either refuses more and
    /// resumes once the refusing sink drains
    #[test]
    fn test_fan_out_pauses_until_every_sink_takes_more() {
        let probe = Probe::default();
        let (source, output) = manual_source("src", &probe);
        let (s1, _) = probe_sink("s1", &probe, true);
        let (s2, s2_control) = probe_sink("s2", &probe, false);

        let network = PipelineNetwork::new();
        network
            .rewire(vec![
                Wiring::new(source.clone(), s1),
                Wiring::new(source, s2),
            ])
            .unwrap();
        let _stream = network.stream(Outcome::default().callbacks()).unwrap();
        assert_eq!(probe.events(), vec!["src resume"]);

        emit(&output).next(vec![7]).unwrap();
        assert_eq!(
            probe.events(),
            vec!["src resume", "s1 write [7]", "s2 write [7]", "src pause"]
        );

        control(&s2_control).drain().unwrap();
        assert_eq!(probe.count("src resume"), 2);
        assert_eq!(probe.count("src pause"), 1);
    }

    /// Ends as soon as it is resumed a second time.
    struct EndOnSecondResume {
        output: OutputSlot,
        resumes: Cell<usize>,
        probe: Probe,
    }

    impl SourceImpl for EndOnSecondResume {
        fn pause(&self) -> StreamResult {
            self.probe.record("src pause");
            Ok(())
        }

        fn resume(&self) -> StreamResult {
            self.probe.record("src resume");
            self.resumes.set(self.resumes.get() + 1);
            if self.resumes.get() == 2 {
                emit(&self.output).end()?;
            }
            Ok(())
        }

        fn destroy(&self) -> StreamResult {
            Ok(())
        }
    }

    /// The transform's drain resumes its upstream, which ends and finishes
    /// the transform from within that drain; the network completes once
    #[test]
    fn test_finish_reached_through_transform_drain_completes_once() {
        let probe = Probe::default();
        let slot: OutputSlot = Rc::new(RefCell::new(None));
        let source = {
            let (captured, probe) = (Rc::clone(&slot), probe.clone());
            SourceFactory::new(move |output| {
                *captured.borrow_mut() = Some(output);
                EndOnSecondResume {
                    output: Rc::clone(&captured),
                    resumes: Cell::new(0),
                    probe,
                }
            })
        };
        let scheduler: Rc<dyn Scheduler> = Rc::new(ManualScheduler::new());
        let transform = buffering_transform(doubling, TransformOptions::default(), scheduler).unwrap();
        let (sink, sink_control) = probe_sink("out", &probe, false);
        let outcome = Outcome::default();

        let network = create_linear(source, vec![transform], sink).unwrap();
        let _stream = network.stream(outcome.callbacks()).unwrap();

        // the refused write pauses the transform, whose own refusal pauses the source
        emit(&slot).next(vec![1]).unwrap();
        assert_eq!(probe.events(), vec!["src resume", "out write [2]", "src pause"]);

        control(&sink_control).drain().unwrap();
        assert_eq!(probe.count("src resume"), 2);
        assert_eq!(probe.count("out finish"), 1);
        assert_eq!(outcome.done(), 1);
        assert!(outcome.failures().is_empty());
    }

    /// A sink fed by two sources finishes after both ended
    #[test]
    fn test_fan_in_finishes_after_all_sources_end() {
        let probe = Probe::default();
        let (a, a_output) = manual_source("a", &probe);
        let (b, b_output) = manual_source("b", &probe);
        let (sink, _) = probe_sink("sink", &probe, true);
        let outcome = Outcome::default();

        let network = PipelineNetwork::new();
        network
            .rewire(vec![Wiring::new(a, sink.clone()), Wiring::new(b, sink)])
            .unwrap();
        let _stream = network.stream(outcome.callbacks()).unwrap();

        emit(&a_output).end().unwrap();
        assert_eq!(probe.count("sink finish"), 0);
        assert_eq!(outcome.done(), 0);

        emit(&b_output).end().unwrap();
        assert_eq!(probe.count("sink finish"), 1);
        assert_eq!(outcome.done(), 1);
    }

    /// The first failure destroys every other live stream and is reported once
    #[test]
    fn test_first_failure_tears_the_network_down() {
        let probe = Probe::default();
        let (source, _output) = manual_source("src", &probe);
        let (s1, s1_control) = probe_sink("s1", &probe, true);
        let (s2, _) = probe_sink("s2", &probe, true);
        let outcome = Outcome::default();

        let network = PipelineNetwork::new();
        network
            .rewire(vec![Wiring::new(source.clone(), s1), Wiring::new(source, s2)])
            .unwrap();
        let stream = network.stream(outcome.callbacks()).unwrap();

        control(&s1_control).fail(anyhow!("broken pipe")).unwrap();

        assert_eq!(outcome.failures(), vec!["broken pipe"]);
        assert_eq!(outcome.done(), 0);
        assert!(stream.is_failed());
        assert_eq!(probe.count("src destroy"), 1);
        assert_eq!(probe.count("s2 destroy"), 1);
        assert_eq!(probe.count("s1 destroy"), 0);

        let err = network.rewire(vec![]).unwrap_err();
        assert!(err.is(ErrorKind::AlreadyFailed));
    }

    #[test]
    fn test_source_failing_at_open_stops_wiring() {
        let (sink, _) = collecting_sink();
        let network = create_linear(error_source(anyhow!("no such file")), vec![], sink.clone()).unwrap();
        let outcome = Outcome::default();

        let _stream = network.stream(outcome.callbacks()).unwrap();

        assert_eq!(outcome.failures(), vec!["no such file"]);
        assert!(!sink.is_opened());
    }

    /// Rewiring destroys streams no connection references any more
    #[test]
    fn test_rewire_retires_unreferenced_streams() {
        let probe = Probe::default();
        let (source, _output) = manual_source("src", &probe);
        let (s1, _) = probe_sink("s1", &probe, true);
        let (s2, _) = probe_sink("s2", &probe, true);

        let network = PipelineNetwork::new();
        network.rewire(vec![Wiring::new(source.clone(), s1)]).unwrap();
        let _stream = network.stream(Outcome::default().callbacks()).unwrap();

        network.rewire(vec![Wiring::new(source.clone(), s2.clone())]).unwrap();

        assert_eq!(probe.count("s1 destroy"), 1);
        assert_eq!(probe.count("src destroy"), 0);
        assert_eq!(probe.count("src resume"), 1);
        assert_eq!(
            network.connections(),
            vec![Connection {
                source: source.id(),
                sink: s2.id()
            }]
        );
    }

    #[test]
    fn test_rewire_destroys_a_duplex_once_both_sides_are_unreferenced() {
        let probe = Probe::default();
        let (source, _output) = manual_source("src", &probe);
        let (sink, _) = probe_sink("sink", &probe, true);
        let duplex_probe = probe.clone();
        let duplex: DuplexFactory<u32, u32> = DuplexFactory::new(move |_output| ProbeDuplex {
            probe: duplex_probe,
        });

        let network = PipelineNetwork::new();
        network
            .rewire(vec![Wiring::new(source.clone(), sink.clone()).via(duplex)])
            .unwrap();
        let _stream = network.stream(Outcome::default().callbacks()).unwrap();
        assert_eq!(probe.count("duplex resume"), 1);

        network.rewire(vec![Wiring::new(source, sink)]).unwrap();
        assert_eq!(probe.count("duplex destroy"), 1);
        assert_eq!(probe.count("sink destroy"), 0);
    }

    #[test]
    fn test_destroying_the_network_cascades() {
        let probe = Probe::default();
        let (source, _output) = manual_source("src", &probe);
        let (sink, _) = probe_sink("sink", &probe, true);
        let outcome = Outcome::default();

        let network = create_linear(source, vec![], sink).unwrap();
        let stream: NetworkStream<u32> = network.stream(outcome.callbacks()).unwrap();

        stream.destroy().unwrap();
        assert_eq!(probe.count("src destroy"), 1);
        assert_eq!(probe.count("sink destroy"), 1);
        assert_eq!(outcome.done(), 0);
        assert!(outcome.failures().is_empty());

        assert!(stream.destroy().unwrap_err().is(ErrorKind::AlreadyDestroyed));
    }

    #[test]
    fn test_destroyed_network_rejects_late_events() {
        let probe = Probe::default();
        let (source, output) = manual_source("src", &probe);
        let (sink, _) = probe_sink("sink", &probe, true);
        let outcome = Outcome::default();

        let network = create_linear(source, vec![], sink).unwrap();
        let stream = network.stream(outcome.callbacks()).unwrap();
        stream.destroy().unwrap();

        let output = emit(&output);
        assert!(output.next(vec![1]).unwrap_err().is(ErrorKind::AlreadyDestroyed));
        assert!(output.fail(anyhow!("late")).unwrap_err().is(ErrorKind::AlreadyDestroyed));
        assert!(outcome.failures().is_empty());
        assert!(network.rewire(vec![]).unwrap_err().is(ErrorKind::AlreadyDestroyed));
    }

    #[test]
    fn test_pipeline_source_ends_when_inner_network_is_done() {
        let outer_source = pipeline_source(|exit| create_linear(source_from_chunks(vec![1, 2, 3]), vec![], exit));
        let (sink, collected) = collecting_sink();
        let outcome = Outcome::default();

        let network = create_linear(outer_source, vec![], sink).unwrap();
        let _stream = network.stream(outcome.callbacks()).unwrap();

        assert_eq!(*collected.borrow(), vec![1, 2, 3]);
        assert_eq!(outcome.done(), 1);
    }

    /// Emits one batch on its first resume and stays open.
    struct EmitOnResume {
        output: SourceOutput<u32>,
        probe: Probe,
    }

    impl SourceImpl for EmitOnResume {
        fn resume(&self) -> StreamResult {
            self.probe.record("inner resume");
            self.output.next(vec![9])
        }

        fn destroy(&self) -> StreamResult {
            self.probe.record("inner destroy");
            Ok(())
        }
    }

    /// The outer network fails on the first batch while the inner network
    /// is still starting; the inner network is torn down once it returns
    #[test]
    fn test_pipeline_source_destroyed_while_starting_tears_down_inner_network() {
        let probe = Probe::default();
        let inner_probe = probe.clone();
        let outer_source = pipeline_source(move |exit| {
            let inner = SourceFactory::new(move |output| EmitOnResume {
                output,
                probe: inner_probe,
            });
            create_linear(inner, vec![], exit)
        });
        let sink = sync_sink(|_chunks: Vec<u32>| Err(anyhow!("disk full")), || {}, || {});
        let outcome = Outcome::default();

        let network = create_linear(outer_source, vec![], sink).unwrap();
        let stream = network.stream(outcome.callbacks()).unwrap();

        assert!(stream.is_failed());
        assert_eq!(outcome.failures(), vec!["disk full"]);
        assert_eq!(probe.events(), vec!["inner resume", "inner destroy"]);
    }

    #[test]
    fn test_pipeline_sink_completes_when_inner_network_is_done() {
        let (inner_sink, collected) = collecting_sink();
        let outer_sink = pipeline_sink(move |entry| create_linear(entry, vec![], inner_sink));
        let outcome = Outcome::default();

        let network = create_linear(source_from_chunks(vec![4, 5]), vec![], outer_sink).unwrap();
        let _stream = network.stream(outcome.callbacks()).unwrap();

        assert_eq!(*collected.borrow(), vec![4, 5]);
        assert_eq!(outcome.done(), 1);
    }

    /// Data processed before the duplex is resumed is held and flushed on
    /// the first resume
    #[test]
    fn test_pipeline_transform_flushes_after_first_resume() {
        let scheduler: Rc<dyn Scheduler> = Rc::new(ManualScheduler::new());
        let inner = buffering_transform(doubling, TransformOptions::default(), scheduler).unwrap();
        let nested = pipeline_transform(move |entry, exit| create_linear(entry, vec![inner], exit));
        let (sink, collected) = collecting_sink();
        let outcome = Outcome::default();

        let network = create_linear(source_from_chunks(vec![1, 2, 3]), vec![nested], sink).unwrap();
        let _stream = network.stream(outcome.callbacks()).unwrap();

        assert_eq!(*collected.borrow(), vec![2, 4, 6]);
        assert_eq!(outcome.done(), 1);
    }

    #[test]
    fn test_inner_failure_fails_the_adapter() {
        let outer_source =
            pipeline_source(|exit| create_linear(error_source(anyhow!("upstream gone")), vec![], exit));
        let (sink, _) = collecting_sink();
        let outcome = Outcome::default();

        let network = create_linear(outer_source, vec![], sink).unwrap();
        let _stream = network.stream(outcome.callbacks()).unwrap();

        assert_eq!(outcome.failures(), vec!["upstream gone"]);
        assert_eq!(outcome.done(), 0);
    }
}
