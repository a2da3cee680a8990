//! Bias-weight tables: population-vs-sample proportion ratios per category
//! or per numeric quantile bin.
//!
//! A weight is the ratio `p_population / p_sample`. The undefined case
//! (category present in the population but absent from the sample) is a
//! tagged [`BiasWeight::Unbounded`] value, not floating-point infinity; it
//! only becomes a number at export time and is resolved to the neutral
//! weight when records are scored.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::distribution::{CategoricalHistogram, NumericSample};

/// Default number of quantile bins for numeric bias tables.
pub const DEFAULT_NBINS: usize = 20;

/// Hard cap applied to combined record weights.
pub const DEFAULT_WEIGHT_CAP: f64 = 100.0;

// ---------------------------------------------------------------------------
// BiasWeight
// ---------------------------------------------------------------------------

/// A correction factor, tagged so the unbounded case cannot silently
/// propagate through arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BiasWeight {
    Finite(f64),
    /// Population mass with zero sample mass: no finite ratio exists.
    Unbounded,
}

impl BiasWeight {
    /// Weight from a proportion pair, per the zero-handling policy:
    /// `p_pop / p_sample` when the sample proportion is positive, unbounded
    /// when only the population proportion is, neutral when both are zero.
    pub fn from_proportions(p_population: f64, p_sample: f64) -> Self {
        if p_sample > 0.0 {
            BiasWeight::Finite(p_population / p_sample)
        } else if p_population > 0.0 {
            BiasWeight::Unbounded
        } else {
            BiasWeight::Finite(1.0)
        }
    }

    /// Numeric form for exports: `Unbounded` becomes `inf`.
    pub fn as_f64(self) -> f64 {
        match self {
            BiasWeight::Finite(w) => w,
            BiasWeight::Unbounded => f64::INFINITY,
        }
    }

    /// Inverse of [`BiasWeight::as_f64`], used when re-loading exported
    /// tables: any non-finite value maps back to `Unbounded`.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            BiasWeight::Finite(value)
        } else {
            BiasWeight::Unbounded
        }
    }
}

// ---------------------------------------------------------------------------
// Categorical table
// ---------------------------------------------------------------------------

/// One categorical bias entry; rows are ordered by key.
#[derive(Debug, Clone)]
pub struct CategoricalBiasRow {
    pub key: String,
    pub count_population: u64,
    pub count_sample: u64,
    pub p_population: f64,
    pub p_sample: f64,
    pub bias: BiasWeight,
}

/// Category -> weight table over the union of population and sample keys.
#[derive(Debug, Clone, Default)]
pub struct CategoricalBiasTable {
    rows: Vec<CategoricalBiasRow>,
}

impl CategoricalBiasTable {
    /// Build the table from a paired population/sample histogram.
    pub fn build(population: &CategoricalHistogram, sample: &CategoricalHistogram) -> Self {
        let keys: std::collections::BTreeSet<&str> =
            population.labels().chain(sample.labels()).collect();
        let n_pop = population.total();
        let n_sam = sample.total();
        let rows = keys
            .into_iter()
            .map(|key| {
                let count_population = population.count(key);
                let count_sample = sample.count(key);
                let p_population = if n_pop > 0 {
                    count_population as f64 / n_pop as f64
                } else {
                    0.0
                };
                let p_sample = if n_sam > 0 {
                    count_sample as f64 / n_sam as f64
                } else {
                    0.0
                };
                CategoricalBiasRow {
                    key: key.to_string(),
                    count_population,
                    count_sample,
                    p_population,
                    p_sample,
                    bias: BiasWeight::from_proportions(p_population, p_sample),
                }
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[CategoricalBiasRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Weight for a normalized key; absent keys are neutral.
    pub fn weight(&self, key: &str) -> BiasWeight {
        self.rows
            .iter()
            .find(|row| row.key == key)
            .map(|row| row.bias)
            .unwrap_or(BiasWeight::Finite(1.0))
    }

    pub fn write_csv(&self, path: &Path) -> std::io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(
            w,
            "key,count_population,count_sample,p_population,p_sample,bias_weight"
        )?;
        for row in &self.rows {
            writeln!(
                w,
                "{},{},{},{},{},{}",
                row.key,
                row.count_population,
                row.count_sample,
                row.p_population,
                row.p_sample,
                row.bias.as_f64()
            )?;
        }
        w.flush()
    }

    /// Re-load an exported table. Malformed rows are skipped.
    pub fn read_csv(path: &Path) -> std::io::Result<Self> {
        let mut rows = Vec::new();
        let reader = BufReader::new(File::open(path)?);
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || (i == 0 && line.starts_with("key,")) {
                continue;
            }
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() != 6 {
                debug!("skipping malformed bias row in {}: {line}", path.display());
                continue;
            }
            let parsed = (
                parts[1].parse::<u64>(),
                parts[2].parse::<u64>(),
                parts[3].parse::<f64>(),
                parts[4].parse::<f64>(),
                parts[5].parse::<f64>(),
            );
            if let (Ok(cp), Ok(cs), Ok(pp), Ok(ps), Ok(bias)) = parsed {
                rows.push(CategoricalBiasRow {
                    key: parts[0].to_string(),
                    count_population: cp,
                    count_sample: cs,
                    p_population: pp,
                    p_sample: ps,
                    bias: BiasWeight::from_f64(bias),
                });
            } else {
                debug!("skipping malformed bias row in {}: {line}", path.display());
            }
        }
        Ok(Self { rows })
    }
}

// ---------------------------------------------------------------------------
// Numeric table
// ---------------------------------------------------------------------------

/// One numeric bin `[left, right)`; the final bin is right-inclusive.
#[derive(Debug, Clone)]
pub struct NumericBiasBin {
    pub left: f64,
    pub right: f64,
    pub count_population: u64,
    pub count_sample: u64,
    pub p_population: f64,
    pub p_sample: f64,
    pub bias: BiasWeight,
}

/// Ordered, contiguous, non-overlapping bins over the population range.
#[derive(Debug, Clone, Default)]
pub struct NumericBiasTable {
    bins: Vec<NumericBiasBin>,
}

impl NumericBiasTable {
    /// Build a quantile-binned table. Bin edges are population quantiles,
    /// deduplicated; fewer than 3 distinct edges falls back to equal-width
    /// bins over `[min, max]`, and a fully degenerate input (min == max)
    /// collapses to a single bin. Returns an empty table when either side
    /// has no values.
    pub fn build(population: &NumericSample, sample: &NumericSample, nbins: usize) -> Self {
        if population.is_empty() || sample.is_empty() || nbins == 0 {
            return Self::default();
        }
        let sorted_pop = population.sorted();
        let edges = bin_edges(&sorted_pop, nbins);
        if edges.len() < 2 {
            return Self::default();
        }

        let pop_counts = histogram_counts(population.values(), &edges);
        let sam_counts = histogram_counts(sample.values(), &edges);
        let n_pop: u64 = pop_counts.iter().sum();
        let n_sam: u64 = sam_counts.iter().sum();

        let bins = (0..edges.len() - 1)
            .map(|i| {
                let p_population = if n_pop > 0 {
                    pop_counts[i] as f64 / n_pop as f64
                } else {
                    0.0
                };
                let p_sample = if n_sam > 0 {
                    sam_counts[i] as f64 / n_sam as f64
                } else {
                    0.0
                };
                NumericBiasBin {
                    left: edges[i],
                    right: edges[i + 1],
                    count_population: pop_counts[i],
                    count_sample: sam_counts[i],
                    p_population,
                    p_sample,
                    bias: BiasWeight::from_proportions(p_population, p_sample),
                }
            })
            .collect();
        Self { bins }
    }

    pub fn bins(&self) -> &[NumericBiasBin] {
        &self.bins
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Containing bin for a finite value, if any. Bins are `[left, right)`
    /// with a right-inclusive final bin.
    pub fn bin_for(&self, value: f64) -> Option<&NumericBiasBin> {
        if !value.is_finite() {
            return None;
        }
        let last = self.bins.len().checked_sub(1)?;
        self.bins.iter().enumerate().find_map(|(i, bin)| {
            let inside = value >= bin.left
                && (value < bin.right || (i == last && value <= bin.right));
            inside.then_some(bin)
        })
    }

    pub fn write_csv(&self, path: &Path) -> std::io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(
            w,
            "bin_left,bin_right,count_population,count_sample,p_population,p_sample,bias_weight"
        )?;
        for bin in &self.bins {
            writeln!(
                w,
                "{},{},{},{},{},{},{}",
                bin.left,
                bin.right,
                bin.count_population,
                bin.count_sample,
                bin.p_population,
                bin.p_sample,
                bin.bias.as_f64()
            )?;
        }
        w.flush()
    }

    /// Re-load an exported table, re-sorted by left edge. Malformed rows are
    /// skipped.
    pub fn read_csv(path: &Path) -> std::io::Result<Self> {
        let mut bins = Vec::new();
        let reader = BufReader::new(File::open(path)?);
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || (i == 0 && line.starts_with("bin_left,")) {
                continue;
            }
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() != 7 {
                debug!("skipping malformed bin row in {}: {line}", path.display());
                continue;
            }
            let parsed = (
                parts[0].parse::<f64>(),
                parts[1].parse::<f64>(),
                parts[2].parse::<u64>(),
                parts[3].parse::<u64>(),
                parts[4].parse::<f64>(),
                parts[5].parse::<f64>(),
                parts[6].parse::<f64>(),
            );
            if let (Ok(left), Ok(right), Ok(cp), Ok(cs), Ok(pp), Ok(ps), Ok(bias)) = parsed {
                bins.push(NumericBiasBin {
                    left,
                    right,
                    count_population: cp,
                    count_sample: cs,
                    p_population: pp,
                    p_sample: ps,
                    bias: BiasWeight::from_f64(bias),
                });
            } else {
                debug!("skipping malformed bin row in {}: {line}", path.display());
            }
        }
        bins.sort_by(|a, b| a.left.partial_cmp(&b.left).unwrap_or(std::cmp::Ordering::Equal));
        Ok(Self { bins })
    }
}

/// Quantile edges over a sorted slice, deduplicated, with the equal-width
/// fallback for degenerate quantile spreads.
fn bin_edges(sorted: &[f64], nbins: usize) -> Vec<f64> {
    let mut edges: Vec<f64> = (0..=nbins)
        .map(|i| interpolated_quantile(sorted, i as f64 / nbins as f64))
        .collect();
    edges.dedup();
    if edges.len() >= 3 {
        return edges;
    }

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    if min == max {
        return vec![min, max];
    }
    let step = (max - min) / nbins as f64;
    let mut edges: Vec<f64> = (0..=nbins).map(|i| min + step * i as f64).collect();
    // Close the range exactly despite accumulated float error.
    edges[nbins] = max;
    edges
}

/// Linear-interpolation quantile of a sorted slice (the `h = q * (n - 1)`
/// convention).
pub(crate) fn interpolated_quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Count values per bin. Values outside `[edges[0], edges[last]]` are not
/// counted; interior bins are half-open, the final bin right-closed.
fn histogram_counts(values: &[f64], edges: &[f64]) -> Vec<u64> {
    let nbins = edges.len() - 1;
    let mut counts = vec![0u64; nbins];
    for &v in values {
        if !v.is_finite() || v < edges[0] || v > edges[nbins] {
            continue;
        }
        let idx = edges.partition_point(|e| *e <= v);
        counts[idx.saturating_sub(1).min(nbins - 1)] += 1;
    }
    counts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bias_weight_policy() {
        assert_eq!(
            BiasWeight::from_proportions(0.8, 0.5),
            BiasWeight::Finite(1.6)
        );
        assert_eq!(BiasWeight::from_proportions(0.3, 0.0), BiasWeight::Unbounded);
        assert_eq!(
            BiasWeight::from_proportions(0.0, 0.0),
            BiasWeight::Finite(1.0)
        );
        assert_eq!(
            BiasWeight::from_proportions(0.0, 0.4),
            BiasWeight::Finite(0.0)
        );
    }

    #[test]
    fn test_bias_weight_f64_roundtrip() {
        assert_eq!(BiasWeight::Unbounded.as_f64(), f64::INFINITY);
        assert_eq!(BiasWeight::from_f64(f64::INFINITY), BiasWeight::Unbounded);
        assert_eq!(BiasWeight::from_f64(f64::NAN), BiasWeight::Unbounded);
        assert_eq!(BiasWeight::from_f64(2.5), BiasWeight::Finite(2.5));
    }

    fn hist(pairs: &[(&str, u64)]) -> CategoricalHistogram {
        let mut h = CategoricalHistogram::new();
        for (k, n) in pairs {
            h.insert(k, *n);
        }
        h
    }

    #[test]
    fn test_categorical_table_reference_example() {
        let pop = hist(&[("a", 80), ("b", 20)]);
        let sam = hist(&[("a", 50), ("b", 50)]);
        let table = CategoricalBiasTable::build(&pop, &sam);
        assert_eq!(table.weight("a"), BiasWeight::Finite(1.6));
        assert_eq!(table.weight("b"), BiasWeight::Finite(0.4));
        assert_eq!(table.weight("absent"), BiasWeight::Finite(1.0));
    }

    #[test]
    fn test_identical_distributions_give_unit_weights() {
        let pop = hist(&[("a", 300), ("b", 500), ("c", 200)]);
        let sam = hist(&[("a", 30), ("b", 50), ("c", 20)]);
        let table = CategoricalBiasTable::build(&pop, &sam);
        for row in table.rows() {
            match row.bias {
                BiasWeight::Finite(w) => assert!((w - 1.0).abs() < 1e-12, "key {}", row.key),
                BiasWeight::Unbounded => panic!("unexpected unbounded weight"),
            }
        }
    }

    #[test]
    fn test_categorical_table_unbounded_and_zero() {
        // "c" only in population -> unbounded; "d" only in sample -> 0.
        let pop = hist(&[("a", 50), ("c", 50)]);
        let sam = hist(&[("a", 50), ("d", 50)]);
        let table = CategoricalBiasTable::build(&pop, &sam);
        assert_eq!(table.weight("c"), BiasWeight::Unbounded);
        assert_eq!(table.weight("d"), BiasWeight::Finite(0.0));
    }

    #[test]
    fn test_categorical_csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bias_status.csv");
        let pop = hist(&[("a", 80), ("c", 20)]);
        let sam = hist(&[("a", 100)]);
        let table = CategoricalBiasTable::build(&pop, &sam);
        table.write_csv(&path).unwrap();

        let loaded = CategoricalBiasTable::read_csv(&path).unwrap();
        assert_eq!(loaded.rows().len(), 2);
        assert_eq!(loaded.weight("a"), BiasWeight::Finite(0.8));
        // The unbounded row survives the inf text round trip.
        assert_eq!(loaded.weight("c"), BiasWeight::Unbounded);
    }

    #[test]
    fn test_numeric_bins_are_contiguous_and_exhaustive() {
        let pop = NumericSample::from_values((0..1000).map(|i| i as f64).collect());
        let sam = NumericSample::from_values((0..100).map(|i| (i * 7) as f64 % 1000.0).collect());
        let table = NumericBiasTable::build(&pop, &sam, 20);
        let bins = table.bins();
        assert!(!bins.is_empty());
        for pair in bins.windows(2) {
            assert!(pair[0].left < pair[0].right);
            assert_eq!(pair[0].right, pair[1].left);
        }
        // Every finite value in [min, max] maps to exactly one bin.
        for v in [0.0, 1.5, 499.9, 999.0] {
            let hits = bins
                .iter()
                .enumerate()
                .filter(|(i, b)| {
                    v >= b.left && (v < b.right || (*i == bins.len() - 1 && v <= b.right))
                })
                .count();
            assert_eq!(hits, 1, "value {v}");
        }
        assert!(table.bin_for(f64::NAN).is_none());
        assert!(table.bin_for(-5.0).is_none());
        assert!(table.bin_for(2000.0).is_none());
    }

    #[test]
    fn test_numeric_bins_last_bin_right_inclusive() {
        let pop = NumericSample::from_values((0..=100).map(|i| i as f64).collect());
        let sam = NumericSample::from_values(vec![100.0]);
        let table = NumericBiasTable::build(&pop, &sam, 10);
        let bin = table.bin_for(100.0).unwrap();
        assert_eq!(bin.right, 100.0);
        assert_eq!(bin.count_sample, 1);
    }

    #[test]
    fn test_numeric_equal_width_fallback() {
        // Heavily repeated values collapse the quantile edges to two.
        let mut values = vec![5.0; 991];
        values.extend(std::iter::repeat_n(10.0, 9));
        let pop = NumericSample::from_values(values);
        let sam = NumericSample::from_values(vec![5.0, 10.0]);
        let table = NumericBiasTable::build(&pop, &sam, 20);
        let bins = table.bins();
        assert_eq!(bins.len(), 20);
        assert_eq!(bins[0].left, 5.0);
        assert_eq!(bins[bins.len() - 1].right, 10.0);
    }

    #[test]
    fn test_numeric_degenerate_single_bin() {
        let pop = NumericSample::from_values(vec![7.0; 50]);
        let sam = NumericSample::from_values(vec![7.0; 5]);
        let table = NumericBiasTable::build(&pop, &sam, 20);
        assert_eq!(table.bins().len(), 1);
        let bin = table.bin_for(7.0).unwrap();
        assert_eq!(bin.count_population, 50);
        assert_eq!(bin.count_sample, 5);
        assert_eq!(bin.bias, BiasWeight::Finite(1.0));
    }

    #[test]
    fn test_numeric_empty_side_gives_empty_table() {
        let pop = NumericSample::from_values(vec![1.0, 2.0]);
        let empty = NumericSample::new();
        assert!(NumericBiasTable::build(&pop, &empty, 20).is_empty());
        assert!(NumericBiasTable::build(&empty, &pop, 20).is_empty());
    }

    #[test]
    fn test_numeric_csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bias_pulls_bins.csv");
        let pop = NumericSample::from_values((0..1000).map(|i| i as f64).collect());
        let sam = NumericSample::from_values((0..200).map(|i| i as f64).collect());
        let table = NumericBiasTable::build(&pop, &sam, 10);
        table.write_csv(&path).unwrap();

        let loaded = NumericBiasTable::read_csv(&path).unwrap();
        assert_eq!(loaded.bins().len(), table.bins().len());
        for (a, b) in loaded.bins().iter().zip(table.bins()) {
            assert!((a.left - b.left).abs() < 1e-9);
            assert!((a.right - b.right).abs() < 1e-9);
            assert_eq!(a.count_population, b.count_population);
        }
    }
}
