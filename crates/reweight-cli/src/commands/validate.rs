//! `reweight validate` — compare the sample's field distributions against
//! the population's, run the divergence diagnostics, and export bias tables
//! for the aggregation pass.

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

use reweight_core::{
    CategoricalBiasTable, FieldSpec, NumericBiasTable, RecordStream, RunConfig, RunWriter,
    SampleTable, SummaryStore, ValidationReport, select_source, test_categorical, test_numeric,
};
use reweight_core::stats::{default_fractions, quantiles, write_quantiles_csv};

pub struct ValidateConfig<'a> {
    pub sample: &'a str,
    pub summary_dir: Option<&'a str>,
    pub population_stream: Option<&'a str>,
    pub fields: Vec<FieldSpec>,
    pub outdir: &'a str,
    pub seed: u64,
    pub reservoir: usize,
    pub nbins: usize,
}

pub fn run(cfg: ValidateConfig<'_>) {
    if cfg.fields.is_empty() {
        super::fatal("no fields requested; pass --categorical/--numeric/--timestamp");
    }
    if cfg.summary_dir.is_none() && cfg.population_stream.is_none() {
        super::fatal("no population source given; pass --summary-dir and/or --population-stream");
    }

    let store = cfg.summary_dir.map(SummaryStore::new);
    let stream = cfg
        .population_stream
        .map(|path| RecordStream::new(path, cfg.reservoir));

    let Some(source) = select_source(store.as_ref(), stream.as_ref(), &cfg.fields) else {
        super::fatal("no usable population source: summary store is empty and no readable stream given");
    };
    println!("Population source: {}", source.name());

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let population = match source.summarize(&cfg.fields, &mut rng) {
        Ok(d) => d,
        Err(e) => super::fatal_io("summarizing population", e),
    };

    let table = match SampleTable::from_csv_path(Path::new(cfg.sample)) {
        Ok(t) => t,
        Err(e) => super::fatal_io("reading sample table", e),
    };
    println!("Sample: {} records from {}", table.len(), cfg.sample);
    let sample = table.summarize(&cfg.fields);

    let mut writer = match RunWriter::create(
        cfg.outdir,
        RunConfig {
            command: "validate".to_string(),
            seed: cfg.seed,
            reservoir_capacity: cfg.reservoir,
            nbins: cfg.nbins,
            weight_cap: reweight_core::DEFAULT_WEIGHT_CAP,
            inputs: run_inputs(&cfg),
        },
    ) {
        Ok(w) => w,
        Err(e) => super::fatal_io("creating output directory", e),
    };
    writer.add_record_counts(population.records_seen, population.records_skipped);
    writer.add_record_counts(sample.records_seen, 0);

    // Divergence diagnostics per distribution pair.
    let mut report = ValidationReport::default();
    for field in &cfg.fields {
        if let Some(name) = field.sample_name() {
            let result = test_numeric(
                &name,
                population.samples[&name].values(),
                sample.samples[&name].values(),
            );
            print_result(&result);
            report.push(result);
        }
        if let Some(name) = field.histogram_name() {
            let result =
                test_categorical(&name, &population.histograms[&name], &sample.histograms[&name]);
            print_result(&result);
            report.push(result);
        }
    }
    write_or_die(report.write_json(&writer.output_path("validation_report.json")));

    // Bias tables and distribution exports.
    for field in &cfg.fields {
        if let Some(name) = field.histogram_name() {
            let pop_hist = &population.histograms[&name];
            let sam_hist = &sample.histograms[&name];
            let bias = CategoricalBiasTable::build(pop_hist, sam_hist);
            write_or_die(bias.write_csv(&writer.output_path(&format!("bias_{name}.csv"))));
            write_or_die(
                pop_hist.write_csv(&writer.output_path(&format!("dist_population_{name}.csv"))),
            );
            write_or_die(
                sam_hist.write_csv(&writer.output_path(&format!("dist_sample_{name}.csv"))),
            );
        }
        if let Some(name) = field.sample_name() {
            let pop_sample = &population.samples[&name];
            let sam_sample = &sample.samples[&name];
            let bias = NumericBiasTable::build(pop_sample, sam_sample, cfg.nbins);
            if bias.is_empty() {
                println!("  {name}: empty distribution pair, no bias bins");
            }
            write_or_die(bias.write_csv(&writer.output_path(&format!("bias_{name}_bins.csv"))));

            let grid = default_fractions();
            let series = [
                ("population", quantiles(pop_sample.values(), &grid)),
                ("sample", quantiles(sam_sample.values(), &grid)),
            ];
            write_or_die(write_quantiles_csv(
                &writer.output_path(&format!("quantiles_{name}.csv")),
                &series,
            ));
        }
    }

    match writer.finish() {
        Ok(dir) => println!("Outputs written to {}", dir.display()),
        Err(e) => super::fatal_io("writing run metadata", e),
    }
}

fn run_inputs(cfg: &ValidateConfig<'_>) -> Vec<String> {
    let mut inputs = vec![cfg.sample.to_string()];
    if let Some(dir) = cfg.summary_dir {
        inputs.push(dir.to_string());
    }
    if let Some(path) = cfg.population_stream {
        inputs.push(path.to_string());
    }
    inputs
}

fn print_result(result: &reweight_core::DivergenceResult) {
    if result.insufficient_data {
        println!("  {} [{}]: insufficient data", result.field, result.test);
        return;
    }
    match result.df {
        Some(df) => println!(
            "  {} [{}]: statistic={:.6} pvalue={:.3e} df={}",
            result.field,
            result.test,
            result.statistic.unwrap_or(f64::NAN),
            result.p_value.unwrap_or(f64::NAN),
            df
        ),
        None => println!(
            "  {} [{}]: statistic={:.6} pvalue={:.3e}",
            result.field,
            result.test,
            result.statistic.unwrap_or(f64::NAN),
            result.p_value.unwrap_or(f64::NAN)
        ),
    }
}

fn write_or_die(result: std::io::Result<()>) {
    if let Err(e) = result {
        super::fatal_io("writing output", e);
    }
}
