use std::io::{self, Write};
use std::time::Instant;

pub struct ConsoleProgress {
    enabled: bool,
    t0: Instant,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            t0: Instant::now(),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if !self.enabled {
            return;
        }
        let ts = fmt_elapsed(self.t0.elapsed().as_secs_f64());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[{ts}] {}", msg.as_ref());
    }

    /// `current` is 1-based; an empty run reports `0/0`.
    pub fn pair(&self, current: usize, total: usize, first: &str, second: &str) {
        if !self.enabled {
            return;
        }
        let ts = fmt_elapsed(self.t0.elapsed().as_secs_f64());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{ts}] pair {} {first} -> {second}",
            fmt_ratio(current, total)
        );
    }
}

/// Default `tracing` directive; `--quiet` keeps only warnings and errors.
pub fn default_log_filter(quiet: bool) -> &'static str {
    if quiet {
        "technique_ltl=warn"
    } else {
        "technique_ltl=info"
    }
}

fn fmt_ratio(current: usize, total: usize) -> String {
    if total == 0 {
        return "0/0".to_string();
    }
    let current = current.min(total);
    let pct = (current as f64 / total as f64) * 100.0;
    format!("{current}/{total} ({pct:5.1}%)")
}

fn fmt_elapsed(seconds: f64) -> String {
    let seconds = seconds.max(0.0) as u64;
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
