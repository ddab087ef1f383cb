use std::io::{self, Write};

use anyhow::Context;

use crate::catalog::TechniqueCatalog;
use crate::engine::TranslationEngine;
use crate::pipeline::trace::TraceWriter;
use crate::printer::FormulaPrinter;
use crate::progress::ConsoleProgress;
use crate::textutil::clip_for_log;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pairs: usize,
    pub formulas: usize,
}

/// Walks adjacent catalog pairs: print utterance, translate, print formulas.
pub struct Harness<E, P> {
    engine: E,
    printer: P,
    trace: TraceWriter,
    progress: ConsoleProgress,
    log_max_chars: usize,
}

impl<E: TranslationEngine, P: FormulaPrinter> Harness<E, P> {
    pub fn new(engine: E, printer: P, progress: ConsoleProgress) -> Self {
        Self {
            engine,
            printer,
            trace: TraceWriter::disabled(),
            progress,
            log_max_chars: 240,
        }
    }

    pub fn with_trace(mut self, trace: TraceWriter) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_log_max_chars(mut self, max_chars: usize) -> Self {
        self.log_max_chars = max_chars;
        self
    }

    /// Stops at the first failing pair; earlier output stays printed.
    pub fn run(&mut self, catalog: &TechniqueCatalog, connector: &str) -> anyhow::Result<RunSummary> {
        let pairs = catalog.pairs(connector);
        let total = pairs.len();
        let settings = self.engine.settings();
        tracing::info!(
            techniques = catalog.len(),
            pairs = total,
            backend = %settings.backend,
            model = %settings.model,
            filter = settings.filter.as_str(),
            "starting translation run"
        );

        let mut summary = RunSummary::default();
        for pair in pairs {
            self.progress
                .pair(pair.index + 1, total, &pair.first, &pair.second);
            self.printer
                .print_utterance(&pair)
                .context("print utterance")?;
            self.trace.write_utterance(&pair)?;

            let translation = self.engine.translate(&pair.utterance).with_context(|| {
                format!(
                    "translate pair {} ({} -> {}): {}",
                    pair.index,
                    pair.first,
                    pair.second,
                    clip_for_log(&pair.utterance, self.log_max_chars)
                )
            })?;
            tracing::debug!(
                index = pair.index,
                candidates = translation.candidates.len(),
                "pair translated"
            );

            self.trace.write_result(&pair, &translation)?;
            self.printer
                .print_translation(&pair, &translation)
                .context("print formulas")?;

            summary.pairs += 1;
            summary.formulas += translation.candidates.len();
        }

        self.progress.info(format!(
            "done: {} pair(s), {} formula(s)",
            summary.pairs, summary.formulas
        ));
        Ok(summary)
    }

    pub fn into_parts(self) -> (E, P) {
        (self.engine, self.printer)
    }
}

/// Prints the combined utterances without contacting any engine.
pub fn dry_run<W: Write>(
    catalog: &TechniqueCatalog,
    connector: &str,
    json: bool,
    mut out: W,
) -> io::Result<usize> {
    let mut n = 0;
    for pair in catalog.pairs(connector) {
        if json {
            let line = serde_json::to_string(&pair).map_err(io::Error::other)?;
            writeln!(out, "{line}")?;
        } else {
            writeln!(out)?;
            writeln!(out, " {}", pair.utterance)?;
        }
        n += 1;
    }
    out.flush()?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DEFAULT_CONNECTOR;

    #[test]
    fn dry_run_prints_each_pair() {
        let mut out = Vec::new();
        let n = dry_run(&TechniqueCatalog::builtin(), DEFAULT_CONNECTOR, false, &mut out)
            .expect("dry run");
        assert_eq!(n, 2);
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text.matches(" . This leads to: ").count(), 2);
        assert!(text.starts_with("\n Attackers leveraged spearphishing"));
    }

    #[test]
    fn dry_run_json_lines() {
        let mut out = Vec::new();
        dry_run(&TechniqueCatalog::builtin(), DEFAULT_CONNECTOR, true, &mut out)
            .expect("dry run");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["first"], "T1548");
        assert_eq!(lines[1]["second"], "T1048");
    }
}
