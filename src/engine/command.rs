use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::{EngineError, EngineSettings, Translation, TranslationEngine};
use crate::textutil::clip_for_log;

/// Runs an external translator once per utterance.
///
/// Each argument may reference `{model}`, `{prompt}`, `{filter}` and
/// `{utterance}`. The utterance is also written to the child's stdin, and the
/// child must print its candidates as JSON on stdout (see
/// [`Translation::from_json`]).
#[derive(Clone, Debug)]
pub struct CommandEngine {
    settings: EngineSettings,
    command: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    log_max_chars: usize,
}

impl CommandEngine {
    pub fn new(settings: EngineSettings, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            settings,
            command: command.into(),
            args,
            cwd: None,
            log_max_chars: 240,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_log_max_chars(mut self, max_chars: usize) -> Self {
        self.log_max_chars = max_chars;
        self
    }

    fn expand_arg(&self, arg: &str, utterance: &str) -> String {
        arg.replace("{model}", &self.settings.model)
            .replace("{prompt}", &self.settings.prompt.display().to_string())
            .replace("{filter}", self.settings.filter.as_str())
            .replace("{utterance}", utterance)
    }

    fn run(&self, utterance: &str) -> Result<String, EngineError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(self.args.iter().map(|a| self.expand_arg(a, utterance)))
            .env("TECHNIQUE_LTL_MODEL", &self.settings.model)
            .env("TECHNIQUE_LTL_PROMPT", &self.settings.prompt)
            .env("TECHNIQUE_LTL_FILTER", self.settings.filter.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        tracing::debug!(
            command = %self.command,
            backend = %self.settings.backend,
            utterance = %clip_for_log(utterance, self.log_max_chars),
            "spawning translation engine"
        );
        let mut child = cmd.spawn().map_err(|err| self.map_spawn_err(err))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that ignores stdin may exit before we finish writing.
            if let Err(err) = stdin.write_all(utterance.as_bytes()) {
                if err.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(self.map_spawn_err(err));
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|err| self.map_spawn_err(err))?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(EngineError::Failed {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: clip_for_log(&stderr, 500),
            });
        }
        if !stderr.trim().is_empty() {
            tracing::debug!(stderr = %clip_for_log(&stderr, self.log_max_chars), "engine stderr");
        }
        Ok(stdout)
    }

    fn map_spawn_err(&self, err: std::io::Error) -> EngineError {
        if err.kind() == std::io::ErrorKind::NotFound {
            EngineError::NotFound {
                command: self.command.clone(),
            }
        } else {
            EngineError::Spawn {
                command: self.command.clone(),
                source: err,
            }
        }
    }
}

impl TranslationEngine for CommandEngine {
    fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn translate(&mut self, utterance: &str) -> Result<Translation, EngineError> {
        let stdout = self.run(utterance)?;
        let translation = Translation::from_json(&stdout)?;
        tracing::debug!(
            candidates = translation.candidates.len(),
            "engine returned candidates"
        );
        Ok(translation)
    }
}
