use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::catalog::UtterancePair;
use crate::engine::Translation;

pub struct TraceWriter {
    dir: PathBuf,
    enabled: bool,
}

impl TraceWriter {
    pub fn new(dir: PathBuf, enabled: bool) -> anyhow::Result<Self> {
        if enabled {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create trace dir: {}", dir.display()))?;
        }
        Ok(Self { dir, enabled })
    }

    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_named_text(&self, name: &str, text: &str) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let path = self.dir.join(sanitize_filename(name));
        std::fs::write(&path, text).with_context(|| format!("write trace: {}", path.display()))?;
        Ok(())
    }

    pub fn write_utterance(&self, pair: &UtterancePair) -> anyhow::Result<()> {
        let name = format!("pair_{:04}.utterance.txt", pair.index);
        self.write_named_text(&name, &pair.utterance)
    }

    pub fn write_result(&self, pair: &UtterancePair, translation: &Translation) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let name = format!("pair_{:04}.result.json", pair.index);
        let body = serde_json::to_string_pretty(translation).context("serialize trace result")?;
        self.write_named_text(&name, &body)
    }
}

fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => out.push('_'),
            _ => out.push(ch),
        }
    }
    out
}
