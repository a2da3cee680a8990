//! Divergence tests between sample and population distributions.
//!
//! Numeric fields get a two-sample Kolmogorov-Smirnov test, categorical
//! fields a chi-squared goodness-of-fit test against population proportions.
//! Both are diagnostic only: results land in the validation report and never
//! feed back into weighting. Degenerate inputs produce an explicit
//! insufficient-data marker instead of NaN.

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::distribution::CategoricalHistogram;

/// Outcome of one divergence test.
#[derive(Debug, Clone, Serialize)]
pub struct DivergenceResult {
    pub field: String,
    pub test: &'static str,
    /// Test statistic; `None` marks insufficient data.
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    /// Degrees of freedom (chi-squared only).
    pub df: Option<u64>,
    pub insufficient_data: bool,
}

impl DivergenceResult {
    fn insufficient(field: &str, test: &'static str) -> Self {
        Self {
            field: field.to_string(),
            test,
            statistic: None,
            p_value: None,
            df: None,
            insufficient_data: true,
        }
    }
}

/// Validation report: one entry per tested field.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub results: Vec<DivergenceResult>,
}

impl ValidationReport {
    pub fn push(&mut self, result: DivergenceResult) {
        self.results.push(result);
    }

    pub fn write_json(&self, path: &std::path::Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

// ---------------------------------------------------------------------------
// Two-sample Kolmogorov-Smirnov
// ---------------------------------------------------------------------------

/// Two-sample KS statistic and asymptotic p-value. Returns `None` when
/// either side is empty.
///
/// The statistic is the supremum distance between the two empirical CDFs,
/// in [0, 1]. The p-value uses the Kolmogorov series with the effective
/// sample size correction `lambda = (sqrt(ne) + 0.12 + 0.11/sqrt(ne)) * d`.
pub fn ks_two_sample(population: &[f64], sample: &[f64]) -> Option<(f64, f64)> {
    let n1 = population.len();
    let n2 = sample.len();
    if n1 == 0 || n2 == 0 {
        return None;
    }

    let mut a = population.to_vec();
    let mut b = sample.to_vec();
    a.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    b.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));

    // Merge-walk both sorted arrays tracking the CDF gap.
    let mut i = 0usize;
    let mut j = 0usize;
    let mut d = 0.0f64;
    while i < n1 && j < n2 {
        let x = if a[i] <= b[j] { a[i] } else { b[j] };
        while i < n1 && a[i] <= x {
            i += 1;
        }
        while j < n2 && b[j] <= x {
            j += 1;
        }
        let gap = (i as f64 / n1 as f64 - j as f64 / n2 as f64).abs();
        if gap > d {
            d = gap;
        }
    }

    let ne = (n1 as f64 * n2 as f64) / (n1 as f64 + n2 as f64);
    let sqrt_ne = ne.sqrt();
    let lambda = (sqrt_ne + 0.12 + 0.11 / sqrt_ne) * d;
    Some((d, kolmogorov_survival(lambda)))
}

/// Survival function of the Kolmogorov distribution,
/// `Q(lambda) = 2 * sum_{j>=1} (-1)^(j-1) exp(-2 j^2 lambda^2)`.
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    let mut sum = 0.0;
    let mut sign = 1.0;
    for j in 1..=100 {
        let term = (-2.0 * (j as f64) * (j as f64) * lambda * lambda).exp();
        sum += sign * term;
        sign = -sign;
        if term < 1e-12 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Run the KS test over a numeric field pair and wrap it as a report entry.
pub fn test_numeric(field: &str, population: &[f64], sample: &[f64]) -> DivergenceResult {
    match ks_two_sample(population, sample) {
        Some((statistic, p_value)) => DivergenceResult {
            field: field.to_string(),
            test: "ks_two_sample",
            statistic: Some(statistic),
            p_value: Some(p_value),
            df: None,
            insufficient_data: false,
        },
        None => DivergenceResult::insufficient(field, "ks_two_sample"),
    }
}

// ---------------------------------------------------------------------------
// Chi-squared goodness of fit
// ---------------------------------------------------------------------------

/// Chi-squared goodness of fit of the sample histogram against population
/// proportions. Expected count per category is
/// `sample_total * population_proportion`. Returns `None` when the total
/// expected mass is zero or the union has fewer than two categories.
///
/// Cells with zero expected mass are excluded from the sum; the degrees of
/// freedom stay `union size - 1`.
pub fn chi_squared_gof(
    population: &CategoricalHistogram,
    sample: &CategoricalHistogram,
) -> Option<(f64, f64, u64)> {
    let keys: std::collections::BTreeSet<&str> =
        population.labels().chain(sample.labels()).collect();
    if keys.len() < 2 {
        return None;
    }
    let sample_total = sample.total() as f64;
    let population_total = population.total() as f64;
    if sample_total <= 0.0 || population_total <= 0.0 {
        return None;
    }

    let mut chi2 = 0.0;
    for key in &keys {
        let observed = sample.count(key) as f64;
        let expected = sample_total * population.count(key) as f64 / population_total;
        if expected > 0.0 {
            let diff = observed - expected;
            chi2 += diff * diff / expected;
        }
    }

    let df = (keys.len() - 1) as u64;
    let dist = ChiSquared::new(df as f64).ok()?;
    Some((chi2, dist.sf(chi2), df))
}

/// Run the goodness-of-fit test over a categorical field pair and wrap it as
/// a report entry.
pub fn test_categorical(
    field: &str,
    population: &CategoricalHistogram,
    sample: &CategoricalHistogram,
) -> DivergenceResult {
    match chi_squared_gof(population, sample) {
        Some((statistic, p_value, df)) => DivergenceResult {
            field: field.to_string(),
            test: "chi_squared_gof",
            statistic: Some(statistic),
            p_value: Some(p_value),
            df: Some(df),
            insufficient_data: false,
        },
        None => DivergenceResult::insufficient(field, "chi_squared_gof"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize, scale: f64, offset: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * scale + offset).collect()
    }

    #[test]
    fn test_ks_identical_samples() {
        let a = ramp(500, 1.0, 0.0);
        let (d, p) = ks_two_sample(&a, &a).unwrap();
        assert!(d.abs() < 1e-12);
        assert!(p > 0.99);
    }

    #[test]
    fn test_ks_disjoint_samples() {
        let a = ramp(200, 1.0, 0.0);
        let b = ramp(200, 1.0, 10_000.0);
        let (d, p) = ks_two_sample(&a, &b).unwrap();
        assert!((d - 1.0).abs() < 1e-12);
        assert!(p < 1e-6);
    }

    #[test]
    fn test_ks_statistic_bounds() {
        let a = ramp(100, 1.0, 0.0);
        let b = ramp(300, 0.7, 20.0);
        let (d, p) = ks_two_sample(&a, &b).unwrap();
        assert!((0.0..=1.0).contains(&d));
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_ks_empty_side_is_insufficient() {
        assert!(ks_two_sample(&[], &[1.0]).is_none());
        let result = test_numeric("size", &[], &[1.0]);
        assert!(result.insufficient_data);
        assert!(result.statistic.is_none());
    }

    #[test]
    fn test_chi_squared_matching_distributions() {
        let mut pop = CategoricalHistogram::new();
        pop.insert("a", 800);
        pop.insert("b", 200);
        let mut sam = CategoricalHistogram::new();
        sam.insert("a", 80);
        sam.insert("b", 20);
        let (chi2, p, df) = chi_squared_gof(&pop, &sam).unwrap();
        assert!(chi2.abs() < 1e-9);
        assert!(p > 0.99);
        assert_eq!(df, 1);
    }

    #[test]
    fn test_chi_squared_skewed_sample() {
        let mut pop = CategoricalHistogram::new();
        pop.insert("a", 500);
        pop.insert("b", 500);
        let mut sam = CategoricalHistogram::new();
        sam.insert("a", 900);
        sam.insert("b", 100);
        let (chi2, p, _) = chi_squared_gof(&pop, &sam).unwrap();
        assert!(chi2 > 100.0);
        assert!(p < 1e-6);
    }

    #[test]
    fn test_chi_squared_zero_expected_cell_excluded() {
        // "c" exists only in the sample; its expected mass is zero and the
        // cell must not blow up the statistic.
        let mut pop = CategoricalHistogram::new();
        pop.insert("a", 50);
        pop.insert("b", 50);
        let mut sam = CategoricalHistogram::new();
        sam.insert("a", 10);
        sam.insert("b", 10);
        sam.insert("c", 5);
        let (chi2, _, df) = chi_squared_gof(&pop, &sam).unwrap();
        assert!(chi2.is_finite());
        assert_eq!(df, 2);
    }

    #[test]
    fn test_chi_squared_insufficient_data() {
        let empty = CategoricalHistogram::new();
        let mut sam = CategoricalHistogram::new();
        sam.insert("a", 10);
        sam.insert("b", 5);
        assert!(chi_squared_gof(&empty, &sam).is_none());

        let result = test_categorical("status", &empty, &sam);
        assert!(result.insufficient_data);
        assert_eq!(result.test, "chi_squared_gof");
    }

    #[test]
    fn test_single_category_is_insufficient() {
        let mut pop = CategoricalHistogram::new();
        pop.insert("only", 100);
        let mut sam = CategoricalHistogram::new();
        sam.insert("only", 10);
        assert!(chi_squared_gof(&pop, &sam).is_none());
    }
}
