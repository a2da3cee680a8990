//! Weighted statistics over the sample, using assigned record weights.
//!
//! All estimators follow the standard weighted second-moment formulas.
//! Degenerate denominators (zero total weight, zero variance, empty tables)
//! produce NaN sentinels rather than errors, so one unreliable metric never
//! aborts a run.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

/// Metric type tag for weighted Pearson correlation rows.
pub const METRIC_NUMERIC_CORRELATION: &str = "numeric_correlation_weighted";
/// Metric type tag for weighted Cramér's V rows.
pub const METRIC_CATEGORICAL_ASSOCIATION: &str = "categorical_association_weighted";

// ---------------------------------------------------------------------------
// Weighted moments
// ---------------------------------------------------------------------------

/// Weighted mean `sum(w*x)/sum(w)`; NaN when the total weight is not
/// positive.
pub fn weighted_mean(x: &[f64], w: &[f64]) -> f64 {
    let total: f64 = w.iter().sum();
    if total <= 0.0 {
        return f64::NAN;
    }
    let dot: f64 = x.iter().zip(w).map(|(xi, wi)| xi * wi).sum();
    dot / total
}

/// Weighted variance `sum(w*(x-mean)^2)/sum(w)`; NaN when the total weight
/// is not positive.
pub fn weighted_variance(x: &[f64], w: &[f64]) -> f64 {
    weighted_covariance(x, x, w)
}

/// Weighted covariance by the second-moment formula; NaN when the total
/// weight is not positive.
pub fn weighted_covariance(x: &[f64], y: &[f64], w: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    debug_assert_eq!(x.len(), w.len());
    let m: f64 = w.iter().sum();
    if m <= 0.0 {
        return f64::NAN;
    }
    let mx = weighted_mean(x, w);
    let my = weighted_mean(y, w);
    let dot: f64 = (0..x.len())
        .map(|i| w[i] * (x[i] - mx) * (y[i] - my))
        .sum();
    dot / m
}

/// Weighted Pearson correlation. NaN when the total weight is not positive
/// or either weighted variance is zero.
///
/// Rows where x, y, or w is non-finite, or w is not positive, are masked
/// out before computing, so partially-missing columns degrade gracefully.
pub fn weighted_correlation(x: &[f64], y: &[f64], w: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    debug_assert_eq!(x.len(), w.len());

    let mask: Vec<usize> = (0..x.len())
        .filter(|&i| x[i].is_finite() && y[i].is_finite() && w[i].is_finite() && w[i] > 0.0)
        .collect();
    if mask.len() < 2 {
        return f64::NAN;
    }

    let m: f64 = mask.iter().map(|&i| w[i]).sum();
    if m <= 0.0 {
        return f64::NAN;
    }
    let mx: f64 = mask.iter().map(|&i| w[i] * x[i]).sum::<f64>() / m;
    let my: f64 = mask.iter().map(|&i| w[i] * y[i]).sum::<f64>() / m;

    let mut vx = 0.0;
    let mut vy = 0.0;
    let mut cov = 0.0;
    for &i in &mask {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        vx += w[i] * dx * dx;
        vy += w[i] * dy * dy;
        cov += w[i] * dx * dy;
    }
    vx /= m;
    vy /= m;
    cov /= m;

    if vx <= 0.0 || vy <= 0.0 {
        return f64::NAN;
    }
    cov / (vx * vy).sqrt()
}

// ---------------------------------------------------------------------------
// Weighted contingency and Cramér's V
// ---------------------------------------------------------------------------

/// A weighted contingency table: cell (r, c) holds the summed weight of
/// records with row label r and column label c.
#[derive(Debug, Clone)]
pub struct ContingencyTable {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

impl ContingencyTable {
    /// Accumulate a table from row-aligned label pairs and weights.
    pub fn from_observations(rows: &[String], cols: &[String], weights: &[f64]) -> Self {
        debug_assert_eq!(rows.len(), cols.len());
        debug_assert_eq!(rows.len(), weights.len());

        let mut mass: BTreeMap<(&str, &str), f64> = BTreeMap::new();
        for i in 0..rows.len() {
            if weights[i].is_finite() {
                *mass.entry((rows[i].as_str(), cols[i].as_str())).or_insert(0.0) += weights[i];
            }
        }

        let row_labels: Vec<String> = {
            let set: std::collections::BTreeSet<&str> = mass.keys().map(|(r, _)| *r).collect();
            set.into_iter().map(String::from).collect()
        };
        let col_labels: Vec<String> = {
            let set: std::collections::BTreeSet<&str> = mass.keys().map(|(_, c)| *c).collect();
            set.into_iter().map(String::from).collect()
        };

        let cells = row_labels
            .iter()
            .map(|r| {
                col_labels
                    .iter()
                    .map(|c| mass.get(&(r.as_str(), c.as_str())).copied().unwrap_or(0.0))
                    .collect()
            })
            .collect();

        Self {
            row_labels,
            col_labels,
            cells,
        }
    }

    /// Build directly from a cell matrix (tests and callers that already
    /// aggregated).
    pub fn from_cells(
        row_labels: Vec<String>,
        col_labels: Vec<String>,
        cells: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            row_labels,
            col_labels,
            cells,
        }
    }

    pub fn grand_total(&self) -> f64 {
        self.cells.iter().flatten().sum()
    }

    /// Write the table with row labels in the first column and one column
    /// per column label.
    pub fn write_csv(&self, path: &Path, row_field: &str, col_field: &str) -> std::io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        write!(w, "{}", row_field)?;
        for c in &self.col_labels {
            write!(w, ",{}={}", col_field, c)?;
        }
        writeln!(w)?;
        for (r, row) in self.row_labels.iter().zip(&self.cells) {
            write!(w, "{}", r)?;
            for v in row {
                write!(w, ",{}", v)?;
            }
            writeln!(w)?;
        }
        w.flush()
    }
}

/// Weighted Cramér's V over a contingency table, in [0, 1].
///
/// Expected cell mass is `row_sum * col_sum / grand_total`; cells with zero
/// expected mass are excluded from the chi-square sum. NaN when the grand
/// total or the `min(rows-1, cols-1)` normalizer is not positive.
pub fn cramers_v(table: &ContingencyTable) -> f64 {
    let n = table.grand_total();
    if n <= 0.0 {
        return f64::NAN;
    }
    let nrows = table.cells.len();
    let ncols = table.col_labels.len();
    if nrows == 0 || ncols == 0 {
        return f64::NAN;
    }

    let row_sums: Vec<f64> = table.cells.iter().map(|row| row.iter().sum()).collect();
    let col_sums: Vec<f64> = (0..ncols)
        .map(|c| table.cells.iter().map(|row| row[c]).sum())
        .collect();

    let mut chi2 = 0.0;
    for r in 0..nrows {
        for c in 0..ncols {
            let expected = row_sums[r] * col_sums[c] / n;
            if expected > 0.0 {
                let diff = table.cells[r][c] - expected;
                chi2 += diff * diff / expected;
            }
        }
    }

    let k = nrows.min(ncols);
    if k < 2 {
        return f64::NAN;
    }
    let denom = n * (k - 1) as f64;
    (chi2 / denom).sqrt()
}

// ---------------------------------------------------------------------------
// Quantiles
// ---------------------------------------------------------------------------

/// The default fraction grid, 0 to 1 in steps of 0.05.
pub fn default_fractions() -> Vec<f64> {
    (0..=20).map(|i| i as f64 / 20.0).collect()
}

/// (fraction, value) pairs via linear interpolation between order
/// statistics. Empty input yields an empty vector.
pub fn quantiles(values: &[f64], fractions: &[f64]) -> Vec<(f64, f64)> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Vec::new();
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    fractions
        .iter()
        .map(|&q| (q, crate::bias::interpolated_quantile(&sorted, q)))
        .collect()
}

/// Write `fraction,value,series` rows for one or more named series.
pub fn write_quantiles_csv(
    path: &Path,
    series: &[(&str, Vec<(f64, f64)>)],
) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "fraction,value,series")?;
    for (name, pairs) in series {
        for (q, v) in pairs {
            writeln!(w, "{},{},{}", q, v, name)?;
        }
    }
    w.flush()
}

// ---------------------------------------------------------------------------
// Weighted group totals
// ---------------------------------------------------------------------------

/// Weighted and unweighted totals for one group of records.
#[derive(Debug, Clone, Serialize)]
pub struct GroupTotalRow {
    pub group: String,
    pub records: u64,
    pub weighted_mass: f64,
    pub marked: u64,
    pub weighted_marked: f64,
}

/// Per-group record counts and weighted mass, with an optional boolean
/// marker column counted both ways. Groups come out sorted by label.
pub fn weighted_group_totals(
    groups: &[String],
    marks: Option<&[bool]>,
    weights: &[f64],
) -> Vec<GroupTotalRow> {
    debug_assert_eq!(groups.len(), weights.len());

    let mut by_group: BTreeMap<&str, GroupTotalRow> = BTreeMap::new();
    for i in 0..groups.len() {
        let entry = by_group
            .entry(groups[i].as_str())
            .or_insert_with(|| GroupTotalRow {
                group: groups[i].clone(),
                records: 0,
                weighted_mass: 0.0,
                marked: 0,
                weighted_marked: 0.0,
            });
        entry.records += 1;
        entry.weighted_mass += weights[i];
        if marks.is_some_and(|m| m[i]) {
            entry.marked += 1;
            entry.weighted_marked += weights[i];
        }
    }
    by_group.into_values().collect()
}

/// Write group totals as
/// `group,records,weighted_mass,marked,weighted_marked` rows.
pub fn write_group_totals_csv(path: &Path, rows: &[GroupTotalRow]) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "group,records,weighted_mass,marked,weighted_marked")?;
    for row in rows {
        writeln!(
            w,
            "{},{},{},{},{}",
            row.group, row.records, row.weighted_mass, row.marked, row.weighted_marked
        )?;
    }
    w.flush()
}

// ---------------------------------------------------------------------------
// Association report
// ---------------------------------------------------------------------------

/// One weighted-association metric row.
#[derive(Debug, Clone, Serialize)]
pub struct AssociationMetric {
    pub variable: String,
    pub metric_type: &'static str,
    pub value: f64,
}

/// Write `variable,metric_type,value` rows. NaN sentinels are written as
/// `NaN`, which round-trips through `f64` parsing.
pub fn write_association_csv(path: &Path, metrics: &[AssociationMetric]) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "variable,metric_type,value")?;
    for m in metrics {
        writeln!(w, "{},{},{}", m.variable, m.metric_type, m.value)?;
    }
    w.flush()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
