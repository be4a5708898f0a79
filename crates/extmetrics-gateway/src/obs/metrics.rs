//! Minimal metrics registry primitives.
//!
//! Counter/gauge/histogram vectors with a fixed label schema, backed by
//! `DashMap`. Each series is an `Arc`'d set of atomics so handles returned by
//! `with` can be held across awaits and updated without touching the map
//! again. Series keys are label values in schema order.

use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use extmetrics_core::error::{ExtMetricsError, Result};

/// Standard Prometheus latency buckets, in seconds.
pub const DEFAULT_DURATION_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// `count` buckets starting at `start`, each `factor` times the previous.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Result<Vec<f64>> {
    if count == 0 {
        return Err(ExtMetricsError::BadConfig("bucket count must be positive".into()));
    }
    if start <= 0.0 {
        return Err(ExtMetricsError::BadConfig("bucket start must be positive".into()));
    }
    if factor <= 1.0 {
        return Err(ExtMetricsError::BadConfig("bucket factor must be greater than 1".into()));
    }
    let mut out = Vec::with_capacity(count);
    let mut b = start;
    for _ in 0..count {
        out.push(b);
        b *= factor;
    }
    Ok(out)
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Resolve `labels` into values ordered by `schema`.
///
/// Supplying a label set that does not match the schema is a programming
/// error; debug builds assert, release builds fill missing values with "".
fn series_key(schema: &[&'static str], labels: &[(&str, &str)]) -> Vec<String> {
    debug_assert_eq!(
        schema.len(),
        labels.len(),
        "label set {labels:?} does not match schema {schema:?}"
    );
    schema
        .iter()
        .map(|name| {
            let v = labels.iter().find(|(k, _)| k == name).map(|(_, v)| *v);
            debug_assert!(v.is_some(), "missing label {name}");
            v.unwrap_or_default().to_string()
        })
        .collect()
}

fn label_str(schema: &[&'static str], values: &[String]) -> String {
    schema
        .iter()
        .zip(values)
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn write_header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

/// Snapshot series sorted by label values, for deterministic output.
fn sorted<V: Clone>(map: &DashMap<Vec<String>, V>) -> Vec<(Vec<String>, V)> {
    let mut series: Vec<_> = map
        .iter()
        .map(|r| (r.key().clone(), r.value().clone()))
        .collect();
    series.sort_by(|a, b| a.0.cmp(&b.0));
    series
}

/// Counter bound to one label combination.
#[derive(Clone, Debug, Default)]
pub struct Counter(Arc<AtomicU64>);

impl Counter {
    /// Increment by 1.
    pub fn inc(&self) {
        self.add(1);
    }
    /// Increment by an arbitrary value.
    pub fn add(&self, v: u64) {
        self.0.fetch_add(v, Ordering::Relaxed);
    }
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct CounterVec {
    name: String,
    help: &'static str,
    schema: &'static [&'static str],
    map: DashMap<Vec<String>, Counter>,
}

impl CounterVec {
    pub fn new(name: impl Into<String>, help: &'static str, schema: &'static [&'static str]) -> Self {
        Self {
            name: name.into(),
            help,
            schema,
            map: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle for one series; created on first use.
    pub fn with(&self, labels: &[(&str, &str)]) -> Counter {
        let key = series_key(self.schema, labels);
        self.map.entry(key).or_default().clone()
    }

    /// Current value of a series (0 if it was never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        let key = series_key(self.schema, labels);
        self.map.get(&key).map(|c| c.get()).unwrap_or(0)
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, out: &mut String) {
        write_header(out, &self.name, self.help, "counter");
        for (key, c) in sorted(&self.map) {
            let _ = writeln!(out, "{}{{{}}} {}", self.name, label_str(self.schema, &key), c.get());
        }
    }
}

/// Gauge bound to one label combination.
#[derive(Clone, Debug, Default)]
pub struct Gauge(Arc<AtomicI64>);

impl Gauge {
    pub fn inc(&self) {
        self.add(1);
    }
    pub fn dec(&self) {
        self.add(-1);
    }
    /// Add an arbitrary signed delta.
    pub fn add(&self, v: i64) {
        self.0.fetch_add(v, Ordering::Relaxed);
    }
    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct GaugeVec {
    name: String,
    help: &'static str,
    schema: &'static [&'static str],
    map: DashMap<Vec<String>, Gauge>,
}

impl GaugeVec {
    pub fn new(name: impl Into<String>, help: &'static str, schema: &'static [&'static str]) -> Self {
        Self {
            name: name.into(),
            help,
            schema,
            map: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with(&self, labels: &[(&str, &str)]) -> Gauge {
        let key = series_key(self.schema, labels);
        self.map.entry(key).or_default().clone()
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        let key = series_key(self.schema, labels);
        self.map.get(&key).map(|g| g.get()).unwrap_or(0)
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, out: &mut String) {
        write_header(out, &self.name, self.help, "gauge");
        for (key, g) in sorted(&self.map) {
            let _ = writeln!(out, "{}{{{}}} {}", self.name, label_str(self.schema, &key), g.get());
        }
    }
}

struct AtomicHistogram {
    count: AtomicU64,
    // f64 bits; updated with a CAS loop.
    sum: AtomicU64,
    // Cumulative: buckets[i] counts every observation <= bounds[i].
    buckets: Box<[AtomicU64]>,
}

impl AtomicHistogram {
    fn new(n: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0f64.to_bits()),
            buckets: (0..n).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }
}

/// Histogram bound to one label combination.
#[derive(Clone)]
pub struct Histogram {
    bounds: Arc<[f64]>,
    inner: Arc<AtomicHistogram>,
}

impl Histogram {
    /// Observe a value and increment cumulative buckets.
    pub fn observe(&self, v: f64) {
        let h = &self.inner;
        h.count.fetch_add(1, Ordering::Relaxed);

        let mut cur = h.sum.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(cur) + v).to_bits();
            match h
                .sum
                .compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => cur = actual,
            }
        }

        for (i, &b) in self.bounds.iter().enumerate() {
            if v <= b {
                h.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Observe a duration in seconds.
    pub fn observe_duration(&self, d: Duration) {
        self.observe(d.as_secs_f64());
    }

    pub fn count(&self) -> u64 {
        self.inner.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> f64 {
        self.inner.sum()
    }
}

pub struct HistogramVec {
    name: String,
    help: &'static str,
    schema: &'static [&'static str],
    bounds: Arc<[f64]>,
    map: DashMap<Vec<String>, Arc<AtomicHistogram>>,
}

impl HistogramVec {
    pub fn new(
        name: impl Into<String>,
        help: &'static str,
        schema: &'static [&'static str],
        buckets: &[f64],
    ) -> Self {
        Self {
            name: name.into(),
            help,
            schema,
            bounds: buckets.into(),
            map: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buckets(&self) -> &[f64] {
        &self.bounds
    }

    pub fn with(&self, labels: &[(&str, &str)]) -> Histogram {
        let key = series_key(self.schema, labels);
        let n = self.bounds.len();
        let inner = self
            .map
            .entry(key)
            .or_insert_with(|| Arc::new(AtomicHistogram::new(n)))
            .clone();
        Histogram {
            bounds: Arc::clone(&self.bounds),
            inner,
        }
    }

    /// Number of observations in a series (0 if it was never touched).
    pub fn sample_count(&self, labels: &[(&str, &str)]) -> u64 {
        let key = series_key(self.schema, labels);
        self.map
            .get(&key)
            .map(|h| h.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum of observations in a series.
    pub fn sample_sum(&self, labels: &[(&str, &str)]) -> f64 {
        let key = series_key(self.schema, labels);
        self.map.get(&key).map(|h| h.sum()).unwrap_or(0.0)
    }

    /// Observations across every series.
    pub fn total_count(&self) -> u64 {
        self.map
            .iter()
            .map(|r| r.value().count.load(Ordering::Relaxed))
            .sum()
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, out: &mut String) {
        write_header(out, &self.name, self.help, "histogram");
        for (key, hist) in sorted(&self.map) {
            let labels = label_str(self.schema, &key);
            let prefix = if labels.is_empty() { String::new() } else { format!("{},", labels) };

            for (i, le) in self.bounds.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", self.name, prefix, le, count);
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", self.name, prefix, count);
            let _ = writeln!(out, "{}_sum{{{}}} {}", self.name, labels, hist.sum());
            let _ = writeln!(out, "{}_count{{{}}} {}", self.name, labels, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &[&str] = &["host"];
    const HTTP: &[&str] = &["host", "code", "method"];

    #[test]
    fn exponential_bucket_schema() {
        let b = exponential_buckets(256.0, 4.0, 8).unwrap();
        assert_eq!(
            b,
            vec![256.0, 1024.0, 4096.0, 16384.0, 65536.0, 262144.0, 1048576.0, 4194304.0]
        );
        assert!(exponential_buckets(256.0, 4.0, 0).is_err());
        assert!(exponential_buckets(0.0, 4.0, 8).is_err());
        assert!(exponential_buckets(1.0, 1.0, 8).is_err());
    }

    #[test]
    fn handles_share_series() {
        let v = CounterVec::new("t_total", "test", HOST);
        v.with(&[("host", "a")]).inc();
        v.with(&[("host", "a")]).add(2);
        v.with(&[("host", "b")]).inc();
        assert_eq!(v.get(&[("host", "a")]), 3);
        assert_eq!(v.get(&[("host", "b")]), 1);
        assert_eq!(v.get(&[("host", "c")]), 0);
    }

    #[test]
    fn label_order_does_not_matter() {
        let v = HistogramVec::new("t", "test", HTTP, &[1.0]);
        v.with(&[("method", "GET"), ("host", "h"), ("code", "200")]).observe(0.5);
        assert_eq!(v.sample_count(&[("host", "h"), ("code", "200"), ("method", "GET")]), 1);
    }

    #[test]
    fn gauge_up_and_down() {
        let v = GaugeVec::new("t", "test", HOST);
        let g = v.with(&[("host", "h")]);
        g.inc();
        g.inc();
        g.dec();
        assert_eq!(v.get(&[("host", "h")]), 1);
    }

    #[test]
    fn histogram_render_is_cumulative() {
        let v = HistogramVec::new("t_bytes", "Sizes.", HTTP, &[256.0, 1024.0]);
        let h = v.with(&[("host", "h"), ("code", "200"), ("method", "GET")]);
        h.observe(100.0);
        h.observe(300.0);
        h.observe(5000.0);

        let mut out = String::new();
        v.render(&mut out);
        assert!(out.contains("# HELP t_bytes Sizes.\n# TYPE t_bytes histogram\n"));
        assert!(out.contains("t_bytes_bucket{host=\"h\",code=\"200\",method=\"GET\",le=\"256\"} 1\n"));
        assert!(out.contains("t_bytes_bucket{host=\"h\",code=\"200\",method=\"GET\",le=\"1024\"} 2\n"));
        assert!(out.contains("t_bytes_bucket{host=\"h\",code=\"200\",method=\"GET\",le=\"+Inf\"} 3\n"));
        assert!(out.contains("t_bytes_sum{host=\"h\",code=\"200\",method=\"GET\"} 5400\n"));
        assert!(out.contains("t_bytes_count{host=\"h\",code=\"200\",method=\"GET\"} 3\n"));
    }

    #[test]
    fn render_escapes_and_sorts() {
        let v = CounterVec::new("t_total", "test", HOST);
        v.with(&[("host", "b")]).inc();
        v.with(&[("host", "a\"q")]).inc();

        let mut out = String::new();
        v.render(&mut out);
        let a = out.find("host=\"a\\\"q\"").unwrap();
        let b = out.find("host=\"b\"").unwrap();
        assert!(a < b);
    }

    #[test]
    fn concurrent_observations_add_up() {
        let v = Arc::new(HistogramVec::new("t", "test", HOST, &DEFAULT_DURATION_BUCKETS));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let v = Arc::clone(&v);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        v.with(&[("host", "h")]).observe(0.5);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(v.sample_count(&[("host", "h")]), 8000);
        assert!((v.sample_sum(&[("host", "h")]) - 4000.0).abs() < 1e-6);
    }
}
