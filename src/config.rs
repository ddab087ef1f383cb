use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "technique-ltl.toml";
pub const CONFIG_ENV: &str = "TECHNIQUE_LTL_CONFIG";

pub const DEFAULT_BACKEND: &str = "nl2ltl";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_PROMPT: &str = "prompts/cyber/new-prompt.json";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub harness: HarnessSection,
    #[serde(default)]
    pub engines: HashMap<String, EngineBackend>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct HarnessSection {
    #[serde(default)]
    pub engine_backend: Option<String>,

    /// Text placed between two adjacent descriptions.
    #[serde(default)]
    pub connector: Option<String>,

    /// Optional catalog TOML; the built-in catalog is used when unset.
    #[serde(default)]
    pub catalog: Option<String>,

    #[serde(default)]
    pub trace_dir: Option<String>,
    #[serde(default)]
    pub trace: Option<bool>,
    #[serde(default)]
    pub log_max_chars: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct EngineBackend {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedBackend {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub model: String,
    pub prompt: String,
    pub filter: Option<String>,
}

impl ResolvedBackend {
    /// Wrapper script next to the config, fed the utterance on stdin.
    pub fn builtin_default() -> Self {
        Self {
            name: DEFAULT_BACKEND.to_string(),
            command: "python3".to_string(),
            args: vec![
                "nl2ltl_bridge.py".to_string(),
                "--model".to_string(),
                "{model}".to_string(),
                "--prompt".to_string(),
                "{prompt}".to_string(),
                "--filter".to_string(),
                "{filter}".to_string(),
            ],
            model: DEFAULT_MODEL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            filter: None,
        }
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Some(p) = find_file_upwards(workdir, filename, 8) {
        return Some(p);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 10) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).context("parse config toml")?;
    Ok(cfg)
}

pub fn resolve_backend(
    cfg: &AppConfig,
    config_path: &Path,
    name: &str,
) -> anyhow::Result<ResolvedBackend> {
    if let Some(b) = cfg.engines.get(name) {
        if b.command.trim().is_empty() {
            return Err(anyhow!(
                "engine {} has an empty command (config={})",
                name,
                config_path.display()
            ));
        }
        let model = b
            .model
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_MODEL)
            .to_string();
        let prompt = b
            .prompt
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_PROMPT)
            .to_string();
        return Ok(ResolvedBackend {
            name: name.to_string(),
            command: b.command.clone(),
            args: b.args.clone(),
            model,
            prompt,
            filter: b.filter.clone(),
        });
    }

    if name == DEFAULT_BACKEND {
        return Ok(ResolvedBackend::builtin_default());
    }

    let mut known: Vec<&str> = cfg.engines.keys().map(String::as_str).collect();
    known.sort_unstable();
    Err(anyhow!(
        "engine backend not configured: {} (known: {}) (config={})",
        name,
        if known.is_empty() {
            "none".to_string()
        } else {
            known.join(", ")
        },
        config_path.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[harness]
engine_backend = "local"
connector = " then "

[engines.local]
command = "./translate.sh"
args = ["{model}"]
model = "gpt-4o"
filter = "greedy"
"#;

    #[test]
    fn parses_sections() {
        let cfg: AppConfig = toml::from_str(SAMPLE).expect("parse");
        assert_eq!(cfg.harness.engine_backend.as_deref(), Some("local"));
        assert_eq!(cfg.harness.connector.as_deref(), Some(" then "));
        let local = &cfg.engines["local"];
        assert_eq!(local.command, "./translate.sh");
        assert_eq!(local.args, ["{model}"]);
    }

    #[test]
    fn resolves_configured_backend_with_defaults() {
        let cfg: AppConfig = toml::from_str(SAMPLE).expect("parse");
        let b = resolve_backend(&cfg, Path::new("technique-ltl.toml"), "local").expect("resolve");
        assert_eq!(b.model, "gpt-4o");
        assert_eq!(b.prompt, DEFAULT_PROMPT);
        assert_eq!(b.filter.as_deref(), Some("greedy"));
    }

    #[test]
    fn falls_back_to_builtin_backend() {
        let b = resolve_backend(&AppConfig::default(), Path::new("x.toml"), DEFAULT_BACKEND)
            .expect("builtin");
        assert_eq!(b, ResolvedBackend::builtin_default());
    }

    #[test]
    fn unknown_backend_lists_known_names() {
        let cfg: AppConfig = toml::from_str(SAMPLE).expect("parse");
        let err = resolve_backend(&cfg, Path::new("x.toml"), "missing").expect_err("unknown");
        assert!(err.to_string().contains("known: local"));
    }

    #[test]
    fn finds_config_in_parent_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(dir.path().join(CONFIG_FILENAME), "").expect("write");
        let found = find_file_upwards(&nested, CONFIG_FILENAME, 4).expect("found");
        assert_eq!(found, dir.path().join(CONFIG_FILENAME));
        assert!(find_file_upwards(&nested, CONFIG_FILENAME, 1).is_none());
    }
}
