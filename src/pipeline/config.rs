use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::catalog::{TechniqueCatalog, DEFAULT_CONNECTOR};
use crate::config::{
    find_default_config, load_config, resolve_backend, AppConfig, ResolvedBackend,
    CONFIG_FILENAME, DEFAULT_BACKEND,
};
use crate::engine::{CommandEngine, EngineSettings, FilterKind};
use crate::pipeline::prompts::{default_prompt_files, resolve_prompt, DEFAULT_PROMPTS_DIR};

pub const DEFAULT_CATALOG_FILENAME: &str = "catalog.toml";
pub const BRIDGE_SCRIPT_FILENAME: &str = "nl2ltl_bridge.py";

const BRIDGE_SCRIPT: &str = include_str!("../../scripts/nl2ltl_bridge.py");

/// Command-line values that take precedence over the config file.
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    /// Value of `TECHNIQUE_LTL_CONFIG`; consulted after `config`.
    pub config_env: Option<PathBuf>,
    pub engine_backend: Option<String>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub filter: Option<String>,
    pub catalog: Option<PathBuf>,
    pub connector: Option<String>,
    pub trace_dir: Option<PathBuf>,
    pub trace: bool,
    /// Skips the prompt existence check; nothing is sent to the engine.
    pub dry_run: bool,
}

#[derive(Clone, Debug)]
pub struct HarnessConfig {
    pub workdir: PathBuf,
    pub config_path: PathBuf,

    pub catalog: TechniqueCatalog,
    pub catalog_path: Option<PathBuf>,
    pub connector: String,

    pub backend: ResolvedBackend,
    pub engine: EngineSettings,

    pub trace_dir: PathBuf,
    pub trace: bool,
    pub log_max_chars: usize,
}

impl HarnessConfig {
    pub fn load(workdir: &Path, overrides: CliOverrides) -> anyhow::Result<Self> {
        let workdir = workdir
            .canonicalize()
            .unwrap_or_else(|_| workdir.to_path_buf());

        let cfg_file = overrides
            .config
            .clone()
            .or_else(|| overrides.config_env.clone())
            .or_else(|| find_default_config(&workdir, CONFIG_FILENAME));

        let mut file_cfg = AppConfig::default();
        if let Some(p) = cfg_file.as_ref() {
            if p.exists() {
                file_cfg = load_config(p)?;
            } else if overrides.config.is_some() || overrides.config_env.is_some() {
                return Err(anyhow::anyhow!("config not found: {}", p.display()));
            }
        }
        let cfg_path = cfg_file.unwrap_or_else(|| workdir.join(CONFIG_FILENAME));
        let config_dir = cfg_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| workdir.clone());
        let relative_to_config = |p: PathBuf| {
            if p.is_relative() {
                config_dir.join(p)
            } else {
                p
            }
        };

        let catalog_path = overrides
            .catalog
            .clone()
            .or_else(|| {
                file_cfg
                    .harness
                    .catalog
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| relative_to_config(PathBuf::from(s)))
            });
        let catalog = match catalog_path.as_ref() {
            Some(p) => TechniqueCatalog::from_toml_path(p).context("load catalog")?,
            None => TechniqueCatalog::builtin(),
        };

        let connector = overrides
            .connector
            .clone()
            .or_else(|| file_cfg.harness.connector.clone())
            .unwrap_or_else(|| DEFAULT_CONNECTOR.to_string());

        let backend_name = overrides
            .engine_backend
            .clone()
            .or_else(|| file_cfg.harness.engine_backend.clone())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND.to_string());
        let mut backend =
            resolve_backend(&file_cfg, &cfg_path, &backend_name).context("resolve engine")?;
        if let Some(model) = overrides.model.clone() {
            backend.model = model;
        }
        if let Some(prompt) = overrides.prompt.clone() {
            backend.prompt = prompt;
        }
        let filter = match overrides.filter.as_deref().or(backend.filter.as_deref()) {
            Some(s) => FilterKind::parse(s)?,
            None => FilterKind::default(),
        };

        let prompt = if overrides.dry_run {
            relative_to_config(PathBuf::from(&backend.prompt))
        } else {
            resolve_prompt(&cfg_path, &backend.prompt).context("load prompt template")?
        };

        let engine = EngineSettings {
            backend: backend.name.clone(),
            model: backend.model.clone(),
            prompt,
            filter,
        };

        let trace_dir = overrides
            .trace_dir
            .clone()
            .or_else(|| file_cfg.harness.trace_dir.clone().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("_trace"));
        let trace_dir = if trace_dir.is_absolute() {
            trace_dir
        } else {
            workdir.join(trace_dir)
        };
        let trace = overrides.trace
            || overrides.trace_dir.is_some()
            || file_cfg.harness.trace.unwrap_or(false);
        let log_max_chars = file_cfg.harness.log_max_chars.unwrap_or(240).max(16);

        Ok(Self {
            workdir,
            config_path: cfg_path,
            catalog,
            catalog_path,
            connector,
            backend,
            engine,
            trace_dir,
            trace,
            log_max_chars,
        })
    }

    /// External command for the selected backend, run from the config directory.
    pub fn command_engine(&self) -> CommandEngine {
        let cwd = self
            .config_path
            .parent()
            .filter(|p| p.is_dir())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.workdir.clone());
        CommandEngine::new(
            self.engine.clone(),
            self.backend.command.clone(),
            self.backend.args.clone(),
        )
        .with_cwd(cwd)
        .with_log_max_chars(self.log_max_chars)
    }
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILENAME);

    let prompts_dir = dir.join(DEFAULT_PROMPTS_DIR);
    for (rel, body) in default_prompt_files() {
        let p = prompts_dir.join(rel);
        if let Some(parent) = p.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create prompts dir: {}", parent.display()))?;
        }
        if p.exists() && !force {
            continue;
        }
        std::fs::write(&p, body).with_context(|| format!("write prompt: {}", p.display()))?;
    }

    let bridge_path = dir.join(BRIDGE_SCRIPT_FILENAME);
    if !bridge_path.exists() || force {
        std::fs::write(&bridge_path, BRIDGE_SCRIPT)
            .with_context(|| format!("write engine script: {}", bridge_path.display()))?;
    }

    let catalog_path = dir.join(DEFAULT_CATALOG_FILENAME);
    if !catalog_path.exists() || force {
        let body = TechniqueCatalog::builtin()
            .to_toml_string()
            .context("serialize built-in catalog")?;
        std::fs::write(&catalog_path, body)
            .with_context(|| format!("write catalog: {}", catalog_path.display()))?;
    }

    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }

    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TOML: &str = r#"[harness]
engine_backend = "nl2ltl"
connector = " . This leads to: "
catalog = "catalog.toml"

trace = false
trace_dir = "_trace"
log_max_chars = 240

# An engine is any command that reads one utterance on stdin and prints its
# candidate formulas as JSON on stdout, either {"<formula>": confidence, ...}
# or [{"formula": "...", "confidence": 0.9}, ...].
# Arguments may use {model}, {prompt}, {filter} and {utterance}.
# The command runs from this file's directory.
[engines.nl2ltl]
command = "python3"
args = ["nl2ltl_bridge.py", "--model", "{model}", "--prompt", "{prompt}", "--filter", "{filter}"]
model = "gpt-4"
prompt = "prompts/cyber/new-prompt.json"
filter = "basic"
"#;
