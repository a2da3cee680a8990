//! Per-record correction weights.
//!
//! Each sample record maps its field values through the bias tables into one
//! combined weight: the product of all per-field factors, with a hard cap.
//! The policy is "never exclude a record" — a lookup miss or an unbounded
//! factor yields the neutral weight, because dropping records would
//! reintroduce the coverage bias being corrected.

use std::collections::BTreeMap;

use crate::bias::{BiasWeight, CategoricalBiasTable, DEFAULT_WEIGHT_CAP, NumericBiasTable};
use crate::source::{FieldKind, FieldSpec, SampleTable};

/// All bias tables for one aggregation pass, keyed by distribution name.
#[derive(Default)]
pub struct BiasTables {
    pub categorical: BTreeMap<String, CategoricalBiasTable>,
    pub numeric: BTreeMap<String, NumericBiasTable>,
}

impl BiasTables {
    pub fn is_empty(&self) -> bool {
        self.categorical.is_empty() && self.numeric.is_empty()
    }
}

/// Categorical factor for a normalized label. Absent table or key is
/// neutral; an `Unbounded` entry is returned as-is and resolved when the
/// record's factors are combined.
pub fn categorical_factor(table: Option<&CategoricalBiasTable>, label: &str) -> BiasWeight {
    match table {
        Some(table) => table.weight(label),
        None => BiasWeight::Finite(1.0),
    }
}

/// Numeric factor for a value. Non-finite input, out-of-range values,
/// absent tables, and bins whose stored weight is unbounded or non-positive
/// all resolve to the neutral 1.0.
pub fn numeric_factor(table: Option<&NumericBiasTable>, value: f64) -> BiasWeight {
    let Some(table) = table else {
        return BiasWeight::Finite(1.0);
    };
    match table.bin_for(value).map(|bin| bin.bias) {
        Some(BiasWeight::Finite(w)) if w > 0.0 => BiasWeight::Finite(w),
        _ => BiasWeight::Finite(1.0),
    }
}

/// Combine per-field factors into one record weight: multiply everything
/// first, then resolve — an unbounded factor (or any non-finite product)
/// falls back to neutral 1.0, finite products are clipped to `[0, cap]`.
///
/// The order matters and is pinned here: clipping individual factors before
/// multiplying would let a single capped field dominate, which is not what
/// the weighting is calibrated for.
pub fn combine_factors(factors: &[BiasWeight], cap: f64) -> f64 {
    let mut product = 1.0f64;
    for factor in factors {
        match factor {
            BiasWeight::Finite(w) => product *= w,
            BiasWeight::Unbounded => return 1.0,
        }
    }
    if !product.is_finite() {
        return 1.0;
    }
    product.clamp(0.0, cap)
}

/// Assign a weight to every row of the sample table.
///
/// Categorical fields contribute their label factor, numeric fields their
/// bin factor. Timestamp fields contribute through their month table; the
/// epoch distribution exists for divergence testing and quantile reports,
/// not weighting.
pub fn assign_weights(
    table: &SampleTable,
    fields: &[FieldSpec],
    tables: &BiasTables,
    cap: f64,
) -> Vec<f64> {
    let n = table.len();
    let mut factor_columns: Vec<Vec<BiasWeight>> = Vec::new();

    for field in fields {
        match field.kind {
            FieldKind::Categorical => {
                let name = field.histogram_name().unwrap();
                let bias = tables.categorical.get(&name);
                if let Some(labels) = table.categorical_column(&field.name) {
                    factor_columns.push(
                        labels
                            .iter()
                            .map(|label| categorical_factor(bias, label))
                            .collect(),
                    );
                }
            }
            FieldKind::Numeric => {
                let name = field.sample_name().unwrap();
                let bias = tables.numeric.get(&name);
                if let Some(values) = table.numeric_column(&field.name) {
                    factor_columns.push(
                        values.iter().map(|&v| numeric_factor(bias, v)).collect(),
                    );
                }
            }
            FieldKind::Timestamp => {
                let name = field.histogram_name().unwrap();
                let bias = tables.categorical.get(&name);
                if let Some((_, months)) = table.timestamp_column(&field.name) {
                    factor_columns.push(
                        months
                            .iter()
                            .map(|month| categorical_factor(bias, month))
                            .collect(),
                    );
                }
            }
        }
    }

    (0..n)
        .map(|row| {
            let factors: Vec<BiasWeight> =
                factor_columns.iter().map(|col| col[row]).collect();
            combine_factors(&factors, cap)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
