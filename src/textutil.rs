use once_cell::sync::Lazy;
use regex::Regex;

static TECHNIQUE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^T\d{4}(\.\d{3})?$").expect("technique id"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace"));

/// ATT&CK-shaped ids: `T1566`, `T1548.003`.
pub fn looks_like_technique_id(id: &str) -> bool {
    TECHNIQUE_ID_RE.is_match(id)
}

/// Single-line, char-bounded rendering for log fields.
pub fn clip_for_log(text: &str, max_chars: usize) -> String {
    let flat = WS_RE.replace_all(text.trim(), " ");
    if flat.chars().count() <= max_chars {
        return flat.into_owned();
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn technique_ids() {
        assert!(looks_like_technique_id("T1566"));
        assert!(looks_like_technique_id("T1548.003"));
        assert!(!looks_like_technique_id("t1566"));
        assert!(!looks_like_technique_id("T15"));
        assert!(!looks_like_technique_id("phishing"));
    }

    #[test]
    fn clip_flattens_and_truncates() {
        assert_eq!(clip_for_log("  a\n b  ", 10), "a b");
        assert_eq!(clip_for_log("abcdef", 3), "abc…");
        assert_eq!(clip_for_log("ééé", 3), "ééé");
    }
}
