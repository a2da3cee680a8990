//! `reweight summarize` — the precompute pass. Streams the population file
//! once and writes the summary store that later validate runs prefer over
//! re-scanning the stream.

use rand::SeedableRng;
use rand::rngs::StdRng;

use reweight_core::{DistributionSource, FieldSpec, RecordStream, SummaryStore};

pub struct SummarizeConfig<'a> {
    pub population_stream: &'a str,
    pub fields: Vec<FieldSpec>,
    pub outdir: &'a str,
    pub seed: u64,
    pub reservoir: usize,
}

pub fn run(cfg: SummarizeConfig<'_>) {
    if cfg.fields.is_empty() {
        super::fatal("no fields requested; pass --categorical/--numeric/--timestamp");
    }

    let stream = RecordStream::new(cfg.population_stream, cfg.reservoir);
    if !stream.is_available(&cfg.fields) {
        super::fatal(&format!(
            "population stream not readable: {}",
            cfg.population_stream
        ));
    }

    println!(
        "Summarizing {} field(s) from {} (reservoir {}, seed {})...",
        cfg.fields.len(),
        cfg.population_stream,
        cfg.reservoir,
        cfg.seed
    );

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let dists = match stream.summarize(&cfg.fields, &mut rng) {
        Ok(d) => d,
        Err(e) => super::fatal_io("reading population stream", e),
    };

    println!(
        "  {} records ({} skipped)",
        dists.records_seen, dists.records_skipped
    );
    for (name, hist) in &dists.histograms {
        println!("  {}: {} categories, mass {}", name, hist.len(), hist.total());
    }
    for (name, sample) in &dists.samples {
        println!("  {}: reservoir of {} values", name, sample.len());
    }

    if let Err(e) = SummaryStore::write(&dists, std::path::Path::new(cfg.outdir)) {
        super::fatal_io("writing summary store", e);
    }
    println!("Summary store written to {}", cfg.outdir);
}
