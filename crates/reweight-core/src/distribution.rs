//! Distribution summaries: categorical histograms, numeric samples, and the
//! bounded-memory reservoir used to summarize population streams.
//!
//! A categorical field is summarized as a histogram over normalized labels;
//! a numeric field as a bounded sequence of values. On the sample side the
//! sequence is the full enumeration; on the population side it is a uniform
//! reservoir drawn in a single forward pass.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::Rng;
use serde::Serialize;

/// Default reservoir capacity for population streams.
pub const DEFAULT_RESERVOIR_CAPACITY: usize = 500_000;

/// Normalize a raw categorical value: trim whitespace, map missing/empty to
/// `"unknown"`.
pub fn normalize_category(raw: Option<&str>) -> String {
    match raw {
        None => "unknown".to_string(),
        Some(s) => {
            let t = s.trim();
            if t.is_empty() {
                "unknown".to_string()
            } else {
                t.to_string()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Categorical histogram
// ---------------------------------------------------------------------------

/// Counts per normalized category label. Iteration order is label order,
/// which keeps every export deterministic.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoricalHistogram {
    counts: BTreeMap<String, u64>,
}

impl CategoricalHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the count for an already-normalized label.
    pub fn observe(&mut self, label: &str) {
        *self.counts.entry(label.to_string()).or_insert(0) += 1;
    }

    /// Increment the count for a raw value, normalizing it first.
    pub fn observe_raw(&mut self, raw: Option<&str>) {
        self.observe(&normalize_category(raw));
    }

    /// Insert an absolute count (used when loading precomputed summaries).
    pub fn insert(&mut self, label: &str, count: u64) {
        *self.counts.entry(label.to_string()).or_insert(0) += count;
    }

    pub fn count(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Total observation mass. Zero means "no observations", which callers
    /// must treat as insufficient data rather than divide by it.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Proportion of total mass carried by `label`; 0.0 when the histogram
    /// is empty.
    pub fn proportion(&self, label: &str) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.count(label) as f64 / total as f64
        }
    }

    /// Write the histogram as `key,count,proportion` rows.
    pub fn write_csv(&self, path: &Path) -> std::io::Result<()> {
        let total = self.total();
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "key,count,proportion")?;
        for (key, count) in self.iter() {
            let p = if total > 0 {
                count as f64 / total as f64
            } else {
                0.0
            };
            writeln!(w, "{},{},{}", key, count, p)?;
        }
        w.flush()
    }
}

// ---------------------------------------------------------------------------
// Numeric sample
// ---------------------------------------------------------------------------

/// A bounded sequence of finite numeric observations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NumericSample {
    values: Vec<f64>,
}

impl NumericSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        let values = values.into_iter().filter(|v| v.is_finite()).collect();
        Self { values }
    }

    /// Append an observation; non-finite values are dropped.
    pub fn push(&mut self, value: f64) {
        if value.is_finite() {
            self.values.push(value);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Values sorted ascending. NaNs cannot occur here, so the ordering is
    /// total.
    pub fn sorted(&self) -> Vec<f64> {
        let mut v = self.values.clone();
        v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        v
    }

    /// Write the sample as `value` rows, the reservoir-series shape of the
    /// summary store.
    pub fn write_csv(&self, path: &Path) -> std::io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "value")?;
        for v in &self.values {
            writeln!(w, "{}", v)?;
        }
        w.flush()
    }
}

// ---------------------------------------------------------------------------
// Reservoir
// ---------------------------------------------------------------------------

/// Uniform reservoir over a stream of unknown length (Algorithm R).
///
/// The first `capacity` items fill the reservoir; the i-th item afterwards
/// (1-indexed over the whole stream) replaces a uniformly chosen slot with
/// probability `capacity / i`. The result is a uniform random
/// `capacity`-subset of the stream, independent of arrival order, in O(N)
/// time and O(capacity) memory.
///
/// The RNG is caller-supplied so runs are reproducible and summarization
/// stages do not couple through hidden shared state.
#[derive(Debug, Clone)]
pub struct Reservoir {
    capacity: usize,
    seen: u64,
    values: Vec<f64>,
}

impl Reservoir {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: 0,
            values: Vec::with_capacity(capacity.min(4096)),
        }
    }

    /// Offer one stream item to the reservoir. Non-finite values are dropped
    /// before they count against the stream length.
    pub fn observe<R: Rng + ?Sized>(&mut self, value: f64, rng: &mut R) {
        if !value.is_finite() || self.capacity == 0 {
            return;
        }
        self.seen += 1;
        if self.values.len() < self.capacity {
            self.values.push(value);
            return;
        }
        let j = rng.random_range(0..self.seen);
        if (j as usize) < self.capacity {
            self.values[j as usize] = value;
        }
    }

    /// Number of finite items offered so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_sample(self) -> NumericSample {
        NumericSample {
            values: self.values,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category(None), "unknown");
        assert_eq!(normalize_category(Some("")), "unknown");
        assert_eq!(normalize_category(Some("   ")), "unknown");
        assert_eq!(normalize_category(Some("  active ")), "active");
    }

    #[test]
    fn test_histogram_counts_and_proportions() {
        let mut h = CategoricalHistogram::new();
        h.observe("a");
        h.observe("a");
        h.observe("b");
        h.observe_raw(None);
        assert_eq!(h.total(), 4);
        assert_eq!(h.count("a"), 2);
        assert_eq!(h.count("unknown"), 1);
        assert!((h.proportion("a") - 0.5).abs() < 1e-12);
        assert_eq!(h.proportion("missing"), 0.0);
    }

    #[test]
    fn test_empty_histogram_has_zero_mass() {
        let h = CategoricalHistogram::new();
        assert_eq!(h.total(), 0);
        assert_eq!(h.proportion("anything"), 0.0);
    }

    #[test]
    fn test_numeric_sample_drops_non_finite() {
        let mut s = NumericSample::new();
        s.push(1.0);
        s.push(f64::NAN);
        s.push(f64::INFINITY);
        s.push(-2.5);
        assert_eq!(s.len(), 2);
        assert_eq!(s.sorted(), vec![-2.5, 1.0]);
    }

    #[test]
    fn test_reservoir_exact_capacity() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut r = Reservoir::new(100);
        for i in 0..10_000 {
            r.observe(i as f64, &mut rng);
        }
        assert_eq!(r.len(), 100);
        assert_eq!(r.seen(), 10_000);
    }

    #[test]
    fn test_reservoir_short_stream_keeps_everything() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut r = Reservoir::new(100);
        for i in 0..40 {
            r.observe(i as f64, &mut rng);
        }
        assert_eq!(r.len(), 40);
        let mut vals = r.values().to_vec();
        vals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f64> = (0..40).map(|i| i as f64).collect();
        assert_eq!(vals, expected);
    }

    #[test]
    fn test_reservoir_inclusion_frequency_is_uniform() {
        // Each of N=200 items should land in a K=50 reservoir with empirical
        // frequency near K/N = 0.25 across many seeds.
        let n = 200usize;
        let k = 50usize;
        let runs = 2000usize;
        let mut hits = vec![0u64; n];
        for seed in 0..runs {
            let mut rng = StdRng::seed_from_u64(seed as u64);
            let mut r = Reservoir::new(k);
            for i in 0..n {
                r.observe(i as f64, &mut rng);
            }
            for &v in r.values() {
                hits[v as usize] += 1;
            }
        }
        let expected = k as f64 / n as f64;
        for (i, &h) in hits.iter().enumerate() {
            let freq = h as f64 / runs as f64;
            assert!(
                (freq - expected).abs() < 0.05,
                "item {} inclusion frequency {} too far from {}",
                i,
                freq,
                expected
            );
        }
    }

    #[test]
    fn test_reservoir_skips_non_finite() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut r = Reservoir::new(10);
        r.observe(f64::NAN, &mut rng);
        r.observe(f64::NEG_INFINITY, &mut rng);
        r.observe(3.0, &mut rng);
        assert_eq!(r.seen(), 1);
        assert_eq!(r.values(), &[3.0]);
    }
}
