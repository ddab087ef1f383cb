//! Drives the pair → translate → print loop with in-memory engines.

use std::io;
use std::path::PathBuf;

use technique_ltl::catalog::{TechniqueCatalog, UtterancePair, DEFAULT_CONNECTOR};
use technique_ltl::engine::{
    EngineError, EngineSettings, FilterKind, FormulaCandidate, Translation, TranslationEngine,
};
use technique_ltl::pipeline::{Harness, TraceWriter};
use technique_ltl::printer::{FormulaPrinter, PrettyPrinter};
use technique_ltl::progress::ConsoleProgress;

struct RecordingEngine {
    settings: EngineSettings,
    calls: Vec<String>,
    fail_on: Option<usize>,
}

impl RecordingEngine {
    fn new() -> Self {
        Self {
            settings: EngineSettings {
                backend: "recording".to_string(),
                model: "gpt-4".to_string(),
                prompt: PathBuf::from("prompts/cyber/new-prompt.json"),
                filter: FilterKind::Basic,
            },
            calls: Vec::new(),
            fail_on: None,
        }
    }
}

impl TranslationEngine for RecordingEngine {
    fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn translate(&mut self, utterance: &str) -> Result<Translation, EngineError> {
        let call = self.calls.len();
        self.calls.push(utterance.to_string());
        if self.fail_on == Some(call) {
            return Err(EngineError::Failed {
                command: "recording".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "model unavailable".to_string(),
            });
        }
        Ok(Translation {
            candidates: vec![FormulaCandidate {
                formula: format!("Response(p{call}, q{call})"),
                confidence: Some(1.0),
                ..Default::default()
            }],
        })
    }
}

#[derive(Default)]
struct RecordingPrinter {
    utterances: Vec<UtterancePair>,
    translations: usize,
}

impl FormulaPrinter for RecordingPrinter {
    fn print_utterance(&mut self, pair: &UtterancePair) -> io::Result<()> {
        self.utterances.push(pair.clone());
        Ok(())
    }

    fn print_translation(&mut self, _pair: &UtterancePair, _t: &Translation) -> io::Result<()> {
        self.translations += 1;
        Ok(())
    }
}

fn quiet() -> ConsoleProgress {
    ConsoleProgress::new(false)
}

#[test]
fn builtin_catalog_translates_two_adjacent_pairs() {
    let catalog = TechniqueCatalog::builtin();
    let mut harness = Harness::new(RecordingEngine::new(), RecordingPrinter::default(), quiet());
    let summary = harness.run(&catalog, DEFAULT_CONNECTOR).expect("run");
    assert_eq!(summary.pairs, 2);
    assert_eq!(summary.formulas, 2);

    let (engine, printer) = harness.into_parts();
    let d: Vec<&str> = catalog
        .entries()
        .iter()
        .map(|t| t.description.as_str())
        .collect();
    assert_eq!(
        engine.calls,
        [
            format!("{} . This leads to: {}", d[0], d[1]),
            format!("{} . This leads to: {}", d[1], d[2]),
        ]
    );
    assert_eq!(printer.utterances.len(), 2);
    assert_eq!(printer.translations, 2);
    assert!(printer.utterances.iter().all(|p| p.first != "T1048"));
}

#[test]
fn engine_called_n_minus_one_times_in_order() {
    let entries: Vec<(String, String)> = (0..6)
        .map(|i| (format!("T10{i:02}"), format!("step {i}")))
        .collect();
    let catalog = TechniqueCatalog::from_entries(entries).expect("catalog");
    let mut harness = Harness::new(RecordingEngine::new(), RecordingPrinter::default(), quiet());
    harness.run(&catalog, DEFAULT_CONNECTOR).expect("run");

    let (engine, _) = harness.into_parts();
    assert_eq!(engine.calls.len(), 5);
    for (i, call) in engine.calls.iter().enumerate() {
        assert_eq!(call, &format!("step {i} . This leads to: step {}", i + 1));
    }
}

#[test]
fn tiny_catalogs_never_reach_engine_or_printer() {
    let empty = TechniqueCatalog::default();
    let single = TechniqueCatalog::from_entries([("T1566", "only")]).expect("catalog");
    for catalog in [empty, single] {
        let mut harness =
            Harness::new(RecordingEngine::new(), RecordingPrinter::default(), quiet());
        let summary = harness.run(&catalog, DEFAULT_CONNECTOR).expect("run");
        assert_eq!(summary.pairs, 0);
        let (engine, printer) = harness.into_parts();
        assert!(engine.calls.is_empty());
        assert!(printer.utterances.is_empty());
        assert_eq!(printer.translations, 0);
    }
}

#[test]
fn engine_failure_aborts_the_run() {
    let catalog =
        TechniqueCatalog::from_entries([("A", "a"), ("B", "b"), ("C", "c"), ("D", "d")])
            .expect("catalog");
    let mut engine = RecordingEngine::new();
    engine.fail_on = Some(1);
    let mut harness = Harness::new(engine, RecordingPrinter::default(), quiet());

    let err = harness.run(&catalog, DEFAULT_CONNECTOR).expect_err("must fail");
    let msg = format!("{err:#}");
    assert!(msg.contains("translate pair 1 (B -> C)"), "{msg}");
    assert!(msg.contains("model unavailable"), "{msg}");

    let (engine, printer) = harness.into_parts();
    assert_eq!(engine.calls.len(), 2);
    assert_eq!(printer.utterances.len(), 2);
    assert_eq!(printer.translations, 1);
}

#[test]
fn pretty_output_and_trace_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let trace = TraceWriter::new(dir.path().join("_trace"), true).expect("trace");
    let mut harness = Harness::new(RecordingEngine::new(), PrettyPrinter::new(Vec::new()), quiet())
        .with_trace(trace);
    harness
        .run(&TechniqueCatalog::builtin(), DEFAULT_CONNECTOR)
        .expect("run");

    let (_, printer) = harness.into_parts();
    let out = String::from_utf8(printer.into_inner()).expect("utf8");
    assert!(out.contains("Formula: Response(p0, q0)"));
    assert!(out.contains("Formula: Response(p1, q1)"));
    assert!(out.find("Response(p0, q0)") < out.find("Attackers modifies the tty_tickets line in the sudoers file to gain root access . This leads to"));

    for i in 0..2 {
        assert!(dir.path().join(format!("_trace/pair_{i:04}.utterance.txt")).is_file());
        assert!(dir.path().join(format!("_trace/pair_{i:04}.result.json")).is_file());
    }
    assert!(!dir.path().join("_trace/pair_0002.utterance.txt").exists());
}
