use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

pub const DEFAULT_PROMPTS_DIR: &str = "prompts";

/// Resolves a prompt template name against the config directory. The
/// template's schema belongs to the engine; only existence is checked here.
pub fn resolve_prompt(config_path: &Path, name: &str) -> anyhow::Result<PathBuf> {
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("empty prompt template name"));
    }
    let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let mut path = PathBuf::from(name);
    if path.is_relative() {
        path = config_dir.join(&path);
    }
    if !path.is_file() {
        return Err(anyhow!(
            "prompt template not found: {} (run: technique-ltl --init-config)",
            path.display()
        ));
    }
    path.canonicalize()
        .with_context(|| format!("resolve prompt: {}", path.display()))
}

/// `(relative path, body)` for prompt files written by `--init-config`.
pub fn default_prompt_files() -> Vec<(&'static str, &'static str)> {
    vec![("cyber/new-prompt.json", DEFAULT_CYBER_PROMPT)]
}

const DEFAULT_CYBER_PROMPT: &str = r#"{
  "description": "Translate a causal chain of attacker behaviours into Declare/LTLf patterns. Replace these examples with ones for your own domain.",
  "examples": [
    {
      "utterance": "Attackers send a phishing email . This leads to: Attackers run a malicious macro",
      "pattern": "Response",
      "symbols": ["phishing_email", "malicious_macro"]
    },
    {
      "utterance": "Attackers obtain root access . This leads to: Attackers exfiltrate data",
      "pattern": "Precedence",
      "symbols": ["root_access", "exfiltrate_data"]
    }
  ]
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_to_config_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let prompt = dir.path().join("prompts").join("p.json");
        std::fs::create_dir_all(prompt.parent().expect("parent")).expect("mkdir");
        std::fs::write(&prompt, "{}").expect("write");

        let cfg = dir.path().join("technique-ltl.toml");
        let resolved = resolve_prompt(&cfg, "prompts/p.json").expect("resolve");
        assert_eq!(resolved, prompt.canonicalize().expect("canon"));
    }

    #[test]
    fn missing_prompt_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = dir.path().join("technique-ltl.toml");
        let err = resolve_prompt(&cfg, "nope.json").expect_err("missing");
        assert!(err.to_string().contains("prompt template not found"));
        assert!(resolve_prompt(&cfg, "  ").is_err());
    }

    #[test]
    fn default_prompt_is_json() {
        for (_, body) in default_prompt_files() {
            serde_json::from_str::<serde_json::Value>(body).expect("valid json");
        }
    }
}
