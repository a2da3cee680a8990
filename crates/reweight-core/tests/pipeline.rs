//! End-to-end pipeline checks: stream summarization through bias tables,
//! weight assignment, and weighted aggregates.

use std::io::Write;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;

use reweight_core::{
    BiasTables, CategoricalBiasTable, DistributionSource, FieldSpec, NumericBiasTable,
    RecordStream, SampleTable, SummaryStore, assign_weights, cramers_v, select_source,
    test_categorical, weighted_group_totals,
};
use reweight_core::stats::ContingencyTable;

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

/// Population 80/20 across two categories, sample 50/50: the reference bias
/// example. The weighted sample mass must recover the population total.
#[test]
fn reweighted_sample_recovers_population_mass() {
    let dir = tempfile::tempdir().unwrap();

    let mut stream_body = String::new();
    for _ in 0..80 {
        stream_body.push_str("{\"kind\": \"a\"}\n");
    }
    for _ in 0..20 {
        stream_body.push_str("{\"kind\": \"b\"}\n");
    }
    let stream_path = write_file(dir.path(), "population.jsonl", &stream_body);

    let mut sample_body = String::from("kind\n");
    for _ in 0..50 {
        sample_body.push_str("a\n");
    }
    for _ in 0..50 {
        sample_body.push_str("b\n");
    }
    let sample_path = write_file(dir.path(), "sample.csv", &sample_body);

    let fields = vec![FieldSpec::categorical("kind")];
    let stream = RecordStream::new(&stream_path, 1000);
    let mut rng = StdRng::seed_from_u64(42);
    let population = stream.summarize(&fields, &mut rng).unwrap();

    let table = SampleTable::from_csv_path(&sample_path).unwrap();
    let sample = table.summarize(&fields);

    let bias = CategoricalBiasTable::build(
        &population.histograms["kind"],
        &sample.histograms["kind"],
    );
    assert_eq!(bias.weight("a"), reweight_core::BiasWeight::Finite(1.6));
    assert_eq!(bias.weight("b"), reweight_core::BiasWeight::Finite(0.4));

    let mut tables = BiasTables::default();
    tables.categorical.insert("kind".to_string(), bias);
    let weights = assign_weights(&table, &fields, &tables, 100.0);

    let total: f64 = weights.iter().sum();
    assert!((total - 100.0).abs() < 1e-9);

    // Per-group weighted mass matches the population histogram.
    let groups = table.categorical_column("kind").unwrap();
    let totals = weighted_group_totals(&groups, None, &weights);
    assert!((totals[0].weighted_mass - 80.0).abs() < 1e-9);
    assert!((totals[1].weighted_mass - 20.0).abs() < 1e-9);
}

/// The summary store round trip: stream -> store -> preferred source, with
/// identical downstream bias tables.
#[test]
fn summary_store_feeds_the_same_pipeline() {
    let dir = tempfile::tempdir().unwrap();

    let mut stream_body = String::new();
    for i in 0..500 {
        stream_body.push_str(&format!(
            "{{\"kind\": \"{}\", \"size\": {}}}\n",
            if i % 5 == 0 { "rare" } else { "common" },
            i
        ));
    }
    let stream_path = write_file(dir.path(), "population.jsonl", &stream_body);

    let fields = vec![FieldSpec::categorical("kind"), FieldSpec::numeric("size")];
    let stream = RecordStream::new(&stream_path, 10_000);
    let mut rng = StdRng::seed_from_u64(7);
    let from_stream = stream.summarize(&fields, &mut rng).unwrap();

    let store_dir = dir.path().join("store");
    SummaryStore::write(&from_stream, &store_dir).unwrap();
    let store = SummaryStore::new(&store_dir);

    let chosen = select_source(Some(&store), Some(&stream), &fields).unwrap();
    assert_eq!(chosen.name(), "summary_store");
    let from_store = chosen.summarize(&fields, &mut rng).unwrap();

    assert_eq!(
        from_store.histograms["kind"].count("rare"),
        from_stream.histograms["kind"].count("rare")
    );
    assert_eq!(
        from_store.samples["size"].len(),
        from_stream.samples["size"].len()
    );

    let sample_vals =
        reweight_core::NumericSample::from_values((0..100).map(|i| i as f64 * 5.0).collect());
    let a = NumericBiasTable::build(&from_stream.samples["size"], &sample_vals, 10);
    let b = NumericBiasTable::build(&from_store.samples["size"], &sample_vals, 10);
    assert_eq!(a.bins().len(), b.bins().len());
    for (x, y) in a.bins().iter().zip(b.bins()) {
        assert_eq!(x.count_population, y.count_population);
        assert_eq!(x.count_sample, y.count_sample);
    }
}

/// Divergence diagnostics and weighted association on a sample with a known
/// marker structure.
#[test]
fn divergence_and_association_reports() {
    let dir = tempfile::tempdir().unwrap();

    // Sample where the marker tracks the category perfectly.
    let mut sample_body = String::from("kind,flagged\n");
    for _ in 0..30 {
        sample_body.push_str("a,true\n");
    }
    for _ in 0..30 {
        sample_body.push_str("b,false\n");
    }
    let sample_path = write_file(dir.path(), "sample.csv", &sample_body);
    let table = SampleTable::from_csv_path(&sample_path).unwrap();

    let fields = vec![FieldSpec::categorical("kind")];
    let sample = table.summarize(&fields);

    // Population with the same composition: the goodness of fit must not
    // reject.
    let mut population = reweight_core::CategoricalHistogram::new();
    population.insert("a", 5000);
    population.insert("b", 5000);
    let result = test_categorical("kind", &population, &sample.histograms["kind"]);
    assert!(!result.insufficient_data);
    assert!(result.p_value.unwrap() > 0.9);
    assert_eq!(result.df, Some(1));

    // Weighted Cramér's V with unit weights on a perfectly associated pair.
    let kinds = table.categorical_column("kind").unwrap();
    let flagged = table.categorical_column("flagged").unwrap();
    let weights = vec![1.0; table.len()];
    let contingency = ContingencyTable::from_observations(&kinds, &flagged, &weights);
    assert!((cramers_v(&contingency) - 1.0).abs() < 1e-9);
}
