use std::cmp::Ordering;
use std::io::{self, Write};

use serde_json::{json, Value};

use crate::catalog::UtterancePair;
use crate::engine::{FormulaCandidate, Translation};

const RULE_WIDTH: usize = 150;

pub trait FormulaPrinter {
    fn print_utterance(&mut self, pair: &UtterancePair) -> io::Result<()>;

    fn print_translation(&mut self, pair: &UtterancePair, translation: &Translation)
        -> io::Result<()>;
}

/// Human-readable console layout.
pub struct PrettyPrinter<W: Write> {
    out: W,
}

impl<W: Write> PrettyPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FormulaPrinter for PrettyPrinter<W> {
    fn print_utterance(&mut self, pair: &UtterancePair) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, " {}", pair.utterance)
    }

    fn print_translation(
        &mut self,
        _pair: &UtterancePair,
        translation: &Translation,
    ) -> io::Result<()> {
        if translation.is_empty() {
            writeln!(self.out, "(no formulas)")?;
            return self.out.flush();
        }
        let rule = "=".repeat(RULE_WIDTH);
        for c in by_confidence(&translation.candidates) {
            writeln!(self.out, "{rule}")?;
            writeln!(self.out, "Formula: {}", c.formula)?;
            if let Some(conf) = c.confidence {
                writeln!(self.out, "Confidence: {conf}")?;
            }
            for (key, value) in &c.extra {
                match value {
                    Value::String(s) => writeln!(self.out, "{key}: {s}")?,
                    other => writeln!(self.out, "{key}: {other}")?,
                }
            }
        }
        writeln!(self.out, "{rule}")?;
        self.out.flush()
    }
}

/// One JSON object per pair; the utterance is part of the record instead of
/// a separate line.
pub struct JsonLinesPrinter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FormulaPrinter for JsonLinesPrinter<W> {
    fn print_utterance(&mut self, _pair: &UtterancePair) -> io::Result<()> {
        Ok(())
    }

    fn print_translation(
        &mut self,
        pair: &UtterancePair,
        translation: &Translation,
    ) -> io::Result<()> {
        let record = json!({
            "index": pair.index,
            "first": pair.first,
            "second": pair.second,
            "utterance": pair.utterance,
            "formulas": by_confidence(&translation.candidates),
        });
        writeln!(self.out, "{record}")?;
        self.out.flush()
    }
}

/// Descending confidence; unscored candidates go last. Stable, so ties keep
/// engine order.
fn by_confidence(candidates: &[FormulaCandidate]) -> Vec<&FormulaCandidate> {
    let mut sorted: Vec<&FormulaCandidate> = candidates.iter().collect();
    sorted.sort_by(|a, b| match (a.confidence, b.confidence) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted
}
