//! Metrics collection and reporting using metrics-rs.
//!
//! The runner records through the `metrics` facade; with `--metrics` the
//! binary installs [`CliRecorder`] and prints a summary at exit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use armdiff_state::Arch;
use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use parking_lot::RwLock;

use crate::runner::Verdict;

// ============================================================================
// Metric descriptions
// ============================================================================

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!(
        "armdiff_entries_passed_total",
        Unit::Count,
        "Corpus entries where both engines agreed"
    );
    describe_counter!(
        "armdiff_entries_mismatched_total",
        Unit::Count,
        "Corpus entries where the engines disagreed"
    );
    describe_counter!(
        "armdiff_entries_errored_total",
        Unit::Count,
        "Corpus entries where an engine failed to execute"
    );
    describe_gauge!(
        "armdiff_corpus_entries",
        Unit::Count,
        "Entries in the loaded corpus"
    );
    describe_histogram!(
        "armdiff_entry_duration_seconds",
        Unit::Seconds,
        "Time to run one entry on both engines and compare"
    );
}

// ============================================================================
// Metric recording functions
// ============================================================================

pub fn record_corpus(corpus: &str, entries: usize) {
    let labels = [("corpus", corpus.to_string())];
    gauge!("armdiff_corpus_entries", &labels).set(entries as f64);
}

/// Record one verdict and how long it took.
pub fn record_entry<A: Arch>(corpus: &str, verdict: &Verdict<A>, elapsed: Duration) {
    let labels = [("corpus", corpus.to_string())];
    match verdict {
        Verdict::Pass => counter!("armdiff_entries_passed_total", &labels).increment(1),
        Verdict::Mismatch(_) => counter!("armdiff_entries_mismatched_total", &labels).increment(1),
        Verdict::ExecutionError { .. } => {
            counter!("armdiff_entries_errored_total", &labels).increment(1);
        }
    }
    histogram!("armdiff_entry_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

// ============================================================================
// CLI Recorder for terminal output
// ============================================================================

#[derive(Default)]
struct CounterStorage {
    values: RwLock<HashMap<String, u64>>,
}

#[derive(Default)]
struct GaugeStorage {
    values: RwLock<HashMap<String, f64>>,
}

#[derive(Default)]
struct HistogramStorage {
    values: RwLock<HashMap<String, Vec<f64>>>,
}

struct CliCounter {
    key: String,
    storage: Arc<CounterStorage>,
}

impl metrics::CounterFn for CliCounter {
    fn increment(&self, value: u64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        let mut values = self.storage.values.write();
        values.insert(self.key.clone(), value);
    }
}

struct CliGauge {
    key: String,
    storage: Arc<GaugeStorage>,
}

impl metrics::GaugeFn for CliGauge {
    fn increment(&self, value: f64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0.0) += value;
    }

    fn decrement(&self, value: f64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0.0) -= value;
    }

    fn set(&self, value: f64) {
        let mut values = self.storage.values.write();
        values.insert(self.key.clone(), value);
    }
}

struct CliHistogram {
    key: String,
    storage: Arc<HistogramStorage>,
}

impl metrics::HistogramFn for CliHistogram {
    fn record(&self, value: f64) {
        let mut values = self.storage.values.write();
        values.entry(self.key.clone()).or_default().push(value);
    }
}

/// In-memory recorder whose contents are printed at exit.
pub struct CliRecorder {
    counters: Arc<CounterStorage>,
    gauges: Arc<GaugeStorage>,
    histograms: Arc<HistogramStorage>,
}

impl CliRecorder {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(CounterStorage::default()),
            gauges: Arc::new(GaugeStorage::default()),
            histograms: Arc::new(HistogramStorage::default()),
        }
    }

    /// A handle sharing this recorder's storage.
    pub fn handle(&self) -> CliRecorderHandle {
        CliRecorderHandle {
            counters: Arc::clone(&self.counters),
            gauges: Arc::clone(&self.gauges),
            histograms: Arc::clone(&self.histograms),
        }
    }

    /// Install as the global recorder. `None` if one is already installed.
    pub fn install(self) -> Option<CliRecorderHandle> {
        let handle = self.handle();
        metrics::set_global_recorder(self).ok()?;
        Some(handle)
    }
}

impl Default for CliRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn key_to_string(key: &Key) -> String {
    let name = key.name();
    let labels = key.labels();
    if labels.len() == 0 {
        name.to_string()
    } else {
        let label_str: Vec<String> = labels
            .map(|l| format!("{}={}", l.key(), l.value()))
            .collect();
        format!("{}{{{}}}", name, label_str.join(","))
    }
}

impl Recorder for CliRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(CliCounter {
            key: key_to_string(key),
            storage: Arc::clone(&self.counters),
        }))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(CliGauge {
            key: key_to_string(key),
            storage: Arc::clone(&self.gauges),
        }))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(CliHistogram {
            key: key_to_string(key),
            storage: Arc::clone(&self.histograms),
        }))
    }
}

/// Read access to what an installed [`CliRecorder`] collected.
pub struct CliRecorderHandle {
    counters: Arc<CounterStorage>,
    gauges: Arc<GaugeStorage>,
    histograms: Arc<HistogramStorage>,
}

impl CliRecorderHandle {
    pub fn get_counter(&self, key: &str) -> Option<u64> {
        self.counters.values.read().get(key).copied()
    }

    pub fn get_gauge(&self, key: &str) -> Option<f64> {
        self.gauges.values.read().get(key).copied()
    }

    pub fn get_histogram(&self, key: &str) -> Option<Vec<f64>> {
        self.histograms.values.read().get(key).cloned()
    }

    /// Print all collected metrics.
    pub fn print_summary(&self) {
        let counters = self.counters.values.read();
        let gauges = self.gauges.values.read();
        let histograms = self.histograms.values.read();

        if counters.is_empty() && gauges.is_empty() && histograms.is_empty() {
            println!("No metrics collected.");
            return;
        }

        println!();
        println!("## Metrics Summary");
        println!();

        if !counters.is_empty() {
            println!("### Counters");
            let mut keys: Vec<_> = counters.keys().collect();
            keys.sort();
            for key in keys {
                if let Some(value) = counters.get(key) {
                    println!("  {key}: {value}");
                }
            }
            println!();
        }

        if !gauges.is_empty() {
            println!("### Gauges");
            let mut keys: Vec<_> = gauges.keys().collect();
            keys.sort();
            for key in keys {
                if let Some(value) = gauges.get(key) {
                    println!("  {key}: {value:.0}");
                }
            }
            println!();
        }

        if !histograms.is_empty() {
            println!("### Histograms");
            let mut keys: Vec<_> = histograms.keys().collect();
            keys.sort();
            for key in keys {
                if let Some(values) = histograms.get(key)
                    && !values.is_empty()
                {
                    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    let sum: f64 = values.iter().sum();
                    let avg = sum / values.len() as f64;
                    println!(
                        "  {key}: count={}, min={min:.6}, max={max:.6}, avg={avg:.6}",
                        values.len()
                    );
                }
            }
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::Label;

    #[test]
    fn test_key_to_string() {
        let key = Key::from_name("armdiff_entries_passed_total");
        assert_eq!(key_to_string(&key), "armdiff_entries_passed_total");

        let key = Key::from_parts(
            "armdiff_entries_passed_total",
            vec![Label::new("corpus", "thumb-loadstore")],
        );
        assert_eq!(
            key_to_string(&key),
            "armdiff_entries_passed_total{corpus=thumb-loadstore}"
        );
    }

    #[test]
    fn test_cli_recorder_storage() {
        let recorder = CliRecorder::new();

        let counter = CliCounter {
            key: "passed".to_string(),
            storage: Arc::clone(&recorder.counters),
        };
        metrics::CounterFn::increment(&counter, 2);
        metrics::CounterFn::increment(&counter, 3);
        assert_eq!(counter.storage.values.read().get("passed"), Some(&5));

        let histogram = CliHistogram {
            key: "duration".to_string(),
            storage: Arc::clone(&recorder.histograms),
        };
        metrics::HistogramFn::record(&histogram, 0.5);
        metrics::HistogramFn::record(&histogram, 0.25);
        assert_eq!(
            histogram.storage.values.read().get("duration"),
            Some(&vec![0.5, 0.25])
        );
    }

    #[test]
    fn test_recording_through_local_recorder() {
        let recorder = CliRecorder::new();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            record_corpus("t", 65);
            record_entry::<armdiff_state::Arm32>("t", &Verdict::Pass, Duration::from_millis(1));
            record_entry::<armdiff_state::Arm32>("t", &Verdict::Pass, Duration::from_millis(2));
        });

        assert_eq!(handle.get_counter("armdiff_entries_passed_total{corpus=t}"), Some(2));
        assert_eq!(handle.get_counter("armdiff_entries_mismatched_total{corpus=t}"), None);
        assert_eq!(handle.get_gauge("armdiff_corpus_entries{corpus=t}"), Some(65.0));
        assert_eq!(
            handle.get_histogram("armdiff_entry_duration_seconds{corpus=t}"),
            Some(vec![0.001, 0.002])
        );
    }
}
