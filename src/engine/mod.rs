//! Seam to the natural-language → temporal-logic translation engine.
//!
//! The harness never builds formulas itself. An engine receives one combined
//! utterance and returns whatever candidate formulas the external translator
//! produced, already filtered by the configured strategy.

mod command;

use std::path::PathBuf;

use anyhow::anyhow;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use command::CommandEngine;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine executable not found: {command}")]
    NotFound { command: String },
    #[error("spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("unparseable engine output: {message}")]
    Parse { message: String },
}

/// Candidate filter applied by the external translator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterKind {
    #[default]
    Basic,
    Greedy,
    None,
}

impl FilterKind {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" | "" => Ok(Self::Basic),
            "greedy" => Ok(Self::Greedy),
            "none" | "off" => Ok(Self::None),
            other => Err(anyhow!("unknown filter: {other} (expected basic, greedy or none)")),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Greedy => "greedy",
            Self::None => "none",
        }
    }
}

/// Fixed dependencies every translate call is made with.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub backend: String,
    pub model: String,
    pub prompt: PathBuf,
    pub filter: FilterKind,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FormulaCandidate {
    pub formula: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Translation {
    pub candidates: Vec<FormulaCandidate>,
}

impl Translation {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Accepts either `{"<formula>": confidence, ...}` or
    /// `[{"formula": "...", "confidence": 0.9, ...}, ...]`.
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        let value: Value = serde_json::from_str(text.trim()).map_err(|err| EngineError::Parse {
            message: err.to_string(),
        })?;
        let candidates = match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(formula, conf)| {
                    Ok(FormulaCandidate {
                        confidence: confidence_of(&formula, &conf)?,
                        formula,
                        extra: Map::new(),
                    })
                })
                .collect::<Result<Vec<_>, EngineError>>()?,
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| candidate_from_item(i, item))
                .collect::<Result<Vec<_>, EngineError>>()?,
            other => {
                return Err(EngineError::Parse {
                    message: format!("expected a JSON object or array, got {}", kind_of(&other)),
                })
            }
        };
        Ok(Self { candidates })
    }
}

fn candidate_from_item(i: usize, item: Value) -> Result<FormulaCandidate, EngineError> {
    match item {
        Value::String(formula) => Ok(FormulaCandidate {
            formula,
            ..Default::default()
        }),
        Value::Object(mut obj) => {
            let formula = match obj.shift_remove("formula") {
                Some(Value::String(s)) => s,
                _ => {
                    return Err(EngineError::Parse {
                        message: format!("item {i}: missing string field \"formula\""),
                    })
                }
            };
            let confidence = match obj.shift_remove("confidence") {
                Some(v) => confidence_of(&formula, &v)?,
                None => None,
            };
            Ok(FormulaCandidate {
                formula,
                confidence,
                extra: obj,
            })
        }
        other => Err(EngineError::Parse {
            message: format!("item {i}: expected object or string, got {}", kind_of(&other)),
        }),
    }
}

fn confidence_of(formula: &str, v: &Value) -> Result<Option<f64>, EngineError> {
    match v {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        other => Err(EngineError::Parse {
            message: format!(
                "confidence for {formula} must be a number, got {}",
                kind_of(other)
            ),
        }),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One call per combined utterance. No retries are layered on top.
pub trait TranslationEngine {
    fn settings(&self) -> &EngineSettings;

    fn translate(&mut self, utterance: &str) -> Result<Translation, EngineError>;
}
