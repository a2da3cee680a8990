//! `reweight aggregate` — load exported bias tables, weight every sample
//! record, and compute weighted aggregates and association metrics.

use std::path::Path;

use log::warn;

use reweight_core::{
    AssociationMetric, BiasTables, CategoricalBiasTable, ContingencyTable, FieldKind, FieldSpec,
    METRIC_CATEGORICAL_ASSOCIATION, METRIC_NUMERIC_CORRELATION, NumericBiasTable, RunConfig,
    RunWriter, SampleTable, assign_weights, cramers_v, weighted_correlation,
    weighted_group_totals,
};
use reweight_core::stats::{write_association_csv, write_group_totals_csv};

pub struct AggregateConfig<'a> {
    pub sample: &'a str,
    pub bias_dir: &'a str,
    pub target: Option<&'a str>,
    pub group_by: Option<&'a str>,
    pub fields: Vec<FieldSpec>,
    pub w_max: f64,
    pub outdir: &'a str,
}

pub fn run(cfg: AggregateConfig<'_>) {
    if cfg.fields.is_empty() {
        super::fatal("no fields requested; pass --categorical/--numeric/--timestamp");
    }

    let tables = load_bias_tables(Path::new(cfg.bias_dir), &cfg.fields);
    if tables.is_empty() {
        super::fatal(&format!("no bias tables found in {}", cfg.bias_dir));
    }

    let table = match SampleTable::from_csv_path(Path::new(cfg.sample)) {
        Ok(t) => t,
        Err(e) => super::fatal_io("reading sample table", e),
    };
    println!("Sample: {} records from {}", table.len(), cfg.sample);

    let weights = assign_weights(&table, &cfg.fields, &tables, cfg.w_max);
    let mass: f64 = weights.iter().sum();
    println!(
        "Assigned weights: total mass {:.3} over {} records (cap {})",
        mass,
        weights.len(),
        cfg.w_max
    );

    let mut writer = match RunWriter::create(
        cfg.outdir,
        RunConfig {
            command: "aggregate".to_string(),
            seed: 0,
            reservoir_capacity: 0,
            nbins: 0,
            weight_cap: cfg.w_max,
            inputs: vec![cfg.sample.to_string(), cfg.bias_dir.to_string()],
        },
    ) {
        Ok(w) => w,
        Err(e) => super::fatal_io("creating output directory", e),
    };
    writer.add_record_counts(table.len() as u64, 0);

    // Weighted group totals.
    if let Some(group_field) = cfg.group_by {
        match table.categorical_column(group_field) {
            Some(groups) => {
                let marks = cfg.target.and_then(|t| boolean_marks(&table, t));
                let rows = weighted_group_totals(&groups, marks.as_deref(), &weights);
                write_or_die(write_group_totals_csv(
                    &writer.output_path("group_totals.csv"),
                    &rows,
                ));
                println!("Group totals over {} groups written", rows.len());
            }
            None => warn!("group column {group_field} not in sample table, skipping totals"),
        }
    }

    // Association metrics against the target column.
    if let Some(target) = cfg.target {
        if !table.has_column(target) {
            super::fatal(&format!("target column {target} not in sample table"));
        }
        let y = table.numeric_column(target).unwrap_or_default();
        let target_labels = table.categorical_column(target).unwrap_or_default();

        let mut metrics = Vec::new();
        for field in &cfg.fields {
            match field.kind {
                FieldKind::Numeric => {
                    if let Some(x) = table.numeric_column(&field.name) {
                        metrics.push(AssociationMetric {
                            variable: field.name.clone(),
                            metric_type: METRIC_NUMERIC_CORRELATION,
                            value: weighted_correlation(&x, &y, &weights),
                        });
                    }
                }
                FieldKind::Timestamp => {
                    if let Some((epochs, _)) = table.timestamp_column(&field.name) {
                        metrics.push(AssociationMetric {
                            variable: format!("{}_epoch", field.name),
                            metric_type: METRIC_NUMERIC_CORRELATION,
                            value: weighted_correlation(&epochs, &y, &weights),
                        });
                    }
                }
                FieldKind::Categorical => {
                    if let Some(labels) = table.categorical_column(&field.name) {
                        let contingency =
                            ContingencyTable::from_observations(&labels, &target_labels, &weights);
                        write_or_die(contingency.write_csv(
                            &writer.output_path(&format!("contingency_{}.csv", field.name)),
                            &field.name,
                            target,
                        ));
                        metrics.push(AssociationMetric {
                            variable: field.name.clone(),
                            metric_type: METRIC_CATEGORICAL_ASSOCIATION,
                            value: cramers_v(&contingency),
                        });
                    }
                }
            }
        }

        for m in &metrics {
            println!("  {} [{}]: {:.6}", m.variable, m.metric_type, m.value);
        }
        write_or_die(write_association_csv(
            &writer.output_path("association_metrics.csv"),
            &metrics,
        ));
    } else {
        println!("No --target given, skipping association metrics");
    }

    match writer.finish() {
        Ok(dir) => println!("Outputs written to {}", dir.display()),
        Err(e) => super::fatal_io("writing run metadata", e),
    }
}

/// Load the bias tables a field schema expects from a validate run's output
/// directory. Missing tables degrade to neutral weighting with a warning.
fn load_bias_tables(dir: &Path, fields: &[FieldSpec]) -> BiasTables {
    let mut tables = BiasTables::default();
    for field in fields {
        if let Some(name) = field.histogram_name() {
            let path = dir.join(format!("bias_{name}.csv"));
            match CategoricalBiasTable::read_csv(&path) {
                Ok(table) if !table.is_empty() => {
                    tables.categorical.insert(name, table);
                }
                Ok(_) => warn!("bias table {} is empty, using neutral weights", path.display()),
                Err(e) => warn!(
                    "bias table {} not loaded ({}), using neutral weights",
                    path.display(),
                    e
                ),
            }
        }
        // Timestamp fields weight through their month table; the epoch bins
        // exist for diagnostics only.
        if field.kind == FieldKind::Numeric {
            let name = field.sample_name().unwrap();
            let path = dir.join(format!("bias_{name}_bins.csv"));
            match NumericBiasTable::read_csv(&path) {
                Ok(table) if !table.is_empty() => {
                    tables.numeric.insert(name, table);
                }
                Ok(_) => warn!("bias table {} is empty, using neutral weights", path.display()),
                Err(e) => warn!(
                    "bias table {} not loaded ({}), using neutral weights",
                    path.display(),
                    e
                ),
            }
        }
    }
    tables
}

/// Interpret a column as boolean marks: nonzero numeric (or true-ish label)
/// is marked, anything unparseable is unmarked.
fn boolean_marks(table: &SampleTable, column: &str) -> Option<Vec<bool>> {
    table
        .numeric_column(column)
        .map(|values| values.iter().map(|v| v.is_finite() && *v != 0.0).collect())
}

fn write_or_die(result: std::io::Result<()>) {
    if let Err(e) = result {
        super::fatal_io("writing output", e);
    }
}
