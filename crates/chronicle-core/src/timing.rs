//! Opt-in per-stage wall-clock timing.
//!
//! Enabled with `--timing` or `CHRONICLE_TIMING=1`. Stages are recorded in
//! the order they first ran, which for a pipeline run is the order of the
//! pipeline itself.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde_json::json;

/// Timing summary for every stage recorded on this thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingReport {
    pub stages: Vec<StageTiming>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTiming {
    pub name: String,
    /// Number of times the stage ran.
    pub count: usize,
    pub total: Duration,
    pub max: Duration,
}

thread_local! {
    static STAGES: RefCell<Vec<StageTiming>> = const { RefCell::new(Vec::new()) };
}

static TIMING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Returns true when `CHRONICLE_TIMING` enables timing collection.
///
/// Supported truthy values: `1`, `true`, `yes`, `on` (case-insensitive).
#[must_use]
pub fn timing_enabled_from_env() -> bool {
    std::env::var("CHRONICLE_TIMING")
        .ok()
        .is_some_and(|value| is_truthy(value.as_str()))
}

pub fn set_timing_enabled(enabled: bool) {
    TIMING_ENABLED.store(enabled, Ordering::Relaxed);
    if !enabled {
        clear_timings();
    }
}

#[must_use]
pub fn is_timing_enabled() -> bool {
    TIMING_ENABLED.load(Ordering::Relaxed)
}

pub fn clear_timings() {
    STAGES.with(|stages| stages.borrow_mut().clear());
}

/// Run `f` as the named stage, recording its duration when enabled.
pub fn timed<R>(name: &str, f: impl FnOnce() -> R) -> R {
    if !is_timing_enabled() {
        return f();
    }

    let started = Instant::now();
    let result = f();
    record(name, started.elapsed());
    result
}

/// Drain this thread's recorded stages into a report.
#[must_use]
pub fn collect_report() -> TimingReport {
    let stages = STAGES.with(|stages| std::mem::take(&mut *stages.borrow_mut()));
    TimingReport { stages }
}

impl TimingReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> Duration {
        self.stages.iter().map(|s| s.total).sum()
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let stages = self
            .stages
            .iter()
            .map(|s| {
                json!({
                    "stage": s.name,
                    "count": s.count,
                    "total_us": s.total.as_micros(),
                    "max_us": s.max.as_micros(),
                })
            })
            .collect::<Vec<_>>();

        json!({ "stages": stages, "total_us": self.total().as_micros() })
    }

    /// Render as a fixed-width table for stderr.
    #[must_use]
    pub fn display_table(&self) -> String {
        if self.stages.is_empty() {
            return "No timing samples recorded.".to_string();
        }

        let mut out = String::new();
        out.push_str("stage                 runs      total        max\n");
        out.push_str("------------------------------------------------\n");
        for s in &self.stages {
            let _ = writeln!(
                out,
                "{:<20} {:>5} {:>10} {:>10}",
                s.name,
                s.count,
                format_duration(s.total),
                format_duration(s.max)
            );
        }
        let _ = writeln!(out, "{:<20} {:>5} {:>10}", "total", "", format_duration(self.total()));
        out
    }
}

fn record(name: &str, elapsed: Duration) {
    STAGES.with(|stages| {
        let mut stages = stages.borrow_mut();
        if let Some(stage) = stages.iter_mut().find(|s| s.name == name) {
            stage.count += 1;
            stage.total += elapsed;
            stage.max = stage.max.max(elapsed);
        } else {
            stages.push(StageTiming {
                name: name.to_string(),
                count: 1,
                total: elapsed,
                max: elapsed,
            });
        }
    });
}

fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();

    if micros >= 1_000_000 {
        let secs = micros / 1_000_000;
        let millis = (micros % 1_000_000) / 1_000;
        format!("{secs}.{millis:03}s")
    } else if micros >= 1_000 {
        let millis = micros / 1_000;
        let rem = micros % 1_000;
        format!("{millis}.{rem:03}ms")
    } else {
        format!("{micros}µs")
    }
}

fn is_truthy(value: &str) -> bool {
    ["1", "true", "yes", "on"]
        .iter()
        .any(|t| value.trim().eq_ignore_ascii_case(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_GUARD: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn disabled_records_nothing() {
        let _guard = TEST_GUARD.lock().expect("test guard lock");
        set_timing_enabled(false);

        assert_eq!(timed("load", || 7_u8), 7);
        assert!(collect_report().is_empty());
    }

    #[test]
    fn stages_keep_first_run_order() {
        let _guard = TEST_GUARD.lock().expect("test guard lock");
        clear_timings();

        record("load", Duration::from_micros(3_000));
        record("group", Duration::from_micros(1_000));
        record("load", Duration::from_micros(1_000));

        let report = collect_report();
        let names: Vec<&str> = report.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["load", "group"]);
        assert_eq!(report.stages[0].count, 2);
        assert_eq!(report.stages[0].total, Duration::from_micros(4_000));
        assert_eq!(report.stages[0].max, Duration::from_micros(3_000));
        assert_eq!(report.total(), Duration::from_micros(5_000));
    }

    #[test]
    fn enabled_timed_records_stage() {
        let _guard = TEST_GUARD.lock().expect("test guard lock");
        set_timing_enabled(true);
        clear_timings();

        assert_eq!(timed("merge", || 42_u8), 42);
        let report = collect_report();
        assert_eq!(report.stages.len(), 1);
        assert_eq!(report.stages[0].name, "merge");

        set_timing_enabled(false);
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy("TrUe"));
        assert!(is_truthy(" 1 "));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
    }

    #[test]
    fn renderers_include_stage_names() {
        let _guard = TEST_GUARD.lock().expect("test guard lock");
        clear_timings();
        record("validate", Duration::from_micros(1_500));

        let report = collect_report();
        let table = report.display_table();
        assert!(table.contains("validate"));
        assert!(table.contains("1.500ms"));

        let json = report.to_json();
        assert_eq!(json["stages"][0]["stage"], "validate");
        assert_eq!(json["stages"][0]["total_us"], 1_500);
    }
}
